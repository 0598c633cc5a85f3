use crate::errors::ParamError;

pub const FLAG_PREFIX: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFlag {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenizedInput {
    pub prompt: String,
    pub flags: Vec<RawFlag>,
}

/// Splits a request line into its leading free-text prompt and the
/// `--flag value` pairs that follow it.
///
/// Double quotes in the prompt group words (so `"a -- b"` stays prompt
/// text) and are kept verbatim. In the flag section both quote styles
/// group a value and are stripped. Flag names are lowercased.
pub fn tokenize(raw: &str) -> Result<TokenizedInput, ParamError> {
    let (prompt, tail) = split_prompt(raw)?;
    Ok(TokenizedInput {
        prompt: prompt.to_string(),
        flags: parse_flags(tail)?,
    })
}

fn split_prompt(raw: &str) -> Result<(&str, &str), ParamError> {
    let mut in_quote = false;
    let mut word_start = true;
    for (idx, ch) in raw.char_indices() {
        if word_start && !in_quote && raw[idx..].starts_with(FLAG_PREFIX) {
            return Ok((raw[..idx].trim(), &raw[idx..]));
        }
        if ch == '"' {
            in_quote = !in_quote;
        }
        word_start = !in_quote && ch.is_whitespace();
    }
    if in_quote {
        return Err(ParamError::Parse(
            "missing closing quote in prompt".to_string(),
        ));
    }
    Ok((raw.trim(), ""))
}

struct Word {
    text: String,
    quoted: bool,
}

fn parse_flags(tail: &str) -> Result<Vec<RawFlag>, ParamError> {
    let mut flags = Vec::new();
    let mut words = split_words(tail)?.into_iter().peekable();
    while let Some(word) = words.next() {
        let name = match word.text.strip_prefix(FLAG_PREFIX) {
            Some(name) if !word.quoted => name,
            _ => {
                return Err(ParamError::Parse(format!(
                    "unexpected token '{}'; quote values that contain spaces",
                    word.text
                )))
            }
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(ParamError::Parse("empty flag name '--'".to_string()));
        }
        let value = match words.peek() {
            Some(next) if next.quoted || !next.text.starts_with(FLAG_PREFIX) => {
                words.next().map(|next| next.text)
            }
            _ => None,
        };
        flags.push(RawFlag { name, value });
    }
    Ok(flags)
}

/// Unquotes each word with `shell_words`, remembering whether any quoting
/// or escaping was involved. A quoted word is always a value.
fn split_words(tail: &str) -> Result<Vec<Word>, ParamError> {
    word_spans(tail)
        .into_iter()
        .map(|span| {
            let text = shell_words::split(span)
                .map_err(|err| ParamError::Parse(err.to_string()))?
                .concat();
            Ok(Word {
                text,
                quoted: span.contains(|ch| matches!(ch, '"' | '\'' | '\\')),
            })
        })
        .collect()
}

fn word_spans(tail: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in tail.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(open) if ch == open => quote = None,
            Some('"') if ch == '\\' => escaped = true,
            Some(_) => {}
            None if ch.is_whitespace() => {
                if let Some(begin) = start.take() {
                    spans.push(&tail[begin..idx]);
                }
            }
            None => {
                start.get_or_insert(idx);
                match ch {
                    '"' | '\'' => quote = Some(ch),
                    '\\' => escaped = true,
                    _ => {}
                }
            }
        }
    }
    if let Some(begin) = start {
        spans.push(&tail[begin..]);
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::{tokenize, RawFlag};
    use crate::errors::ParamError;

    fn flag(name: &str, value: Option<&str>) -> RawFlag {
        RawFlag {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn prompt_only() -> anyhow::Result<()> {
        let parsed = tokenize("  A beautiful sunset over mountains  ")?;
        assert_eq!(parsed.prompt, "A beautiful sunset over mountains");
        assert!(parsed.flags.is_empty());
        Ok(())
    }

    #[test]
    fn prompt_then_flags() -> anyhow::Result<()> {
        let parsed = tokenize(
            "A city skyline at night --aspect_ratio custom --width 1024 --height 576",
        )?;
        assert_eq!(parsed.prompt, "A city skyline at night");
        assert_eq!(
            parsed.flags,
            vec![
                flag("aspect_ratio", Some("custom")),
                flag("width", Some("1024")),
                flag("height", Some("576")),
            ]
        );
        Ok(())
    }

    #[test]
    fn quoted_values_keep_spaces_and_lose_quotes() -> anyhow::Result<()> {
        let parsed = tokenize(r#"fox --prompt "a red fox" --image_prompt 'https://x.test/a b.png'"#)?;
        assert_eq!(
            parsed.flags,
            vec![
                flag("prompt", Some("a red fox")),
                flag("image_prompt", Some("https://x.test/a b.png")),
            ]
        );
        Ok(())
    }

    #[test]
    fn quoted_prompt_text_may_contain_double_dash() -> anyhow::Result<()> {
        let parsed = tokenize(r#"A painting of a "sunset --very beautiful" --aspect_ratio 16:9"#)?;
        assert_eq!(parsed.prompt, r#"A painting of a "sunset --very beautiful""#);
        assert_eq!(parsed.flags, vec![flag("aspect_ratio", Some("16:9"))]);
        Ok(())
    }

    #[test]
    fn apostrophes_in_prompt_are_plain_text() -> anyhow::Result<()> {
        let parsed = tokenize("a dog's favourite toy --seed 7")?;
        assert_eq!(parsed.prompt, "a dog's favourite toy");
        assert_eq!(parsed.flags, vec![flag("seed", Some("7"))]);
        Ok(())
    }

    #[test]
    fn double_dash_inside_a_word_is_not_a_flag() -> anyhow::Result<()> {
        let parsed = tokenize("well--known landmark")?;
        assert_eq!(parsed.prompt, "well--known landmark");
        assert!(parsed.flags.is_empty());
        Ok(())
    }

    #[test]
    fn valueless_flags_are_kept_without_value() -> anyhow::Result<()> {
        let parsed = tokenize("cat --prompt_upsampling --seed 3 --prompt_upsampling")?;
        assert_eq!(
            parsed.flags,
            vec![
                flag("prompt_upsampling", None),
                flag("seed", Some("3")),
                flag("prompt_upsampling", None),
            ]
        );
        Ok(())
    }

    #[test]
    fn flag_names_are_lowercased() -> anyhow::Result<()> {
        let parsed = tokenize("cat --Aspect_Ratio 16:9")?;
        assert_eq!(parsed.flags, vec![flag("aspect_ratio", Some("16:9"))]);
        Ok(())
    }

    #[test]
    fn negative_numbers_are_values() -> anyhow::Result<()> {
        let parsed = tokenize("cat --seed -4")?;
        assert_eq!(parsed.flags, vec![flag("seed", Some("-4"))]);
        Ok(())
    }

    #[test]
    fn unterminated_quote_in_value_is_a_parse_error() {
        let err = tokenize(r#"A forest --prompt "unclosed"#).unwrap_err();
        assert!(matches!(err, ParamError::Parse(_)));
    }

    #[test]
    fn unterminated_quote_in_prompt_is_a_parse_error() {
        let err = tokenize(r#"A "forest at dusk --seed 1"#).unwrap_err();
        assert!(matches!(err, ParamError::Parse(_)));
    }

    #[test]
    fn stray_second_value_is_rejected() {
        let err = tokenize("cat --prompt a red fox").unwrap_err();
        assert_eq!(
            err,
            ParamError::Parse("unexpected token 'red'; quote values that contain spaces".to_string())
        );
    }

    #[test]
    fn quoted_values_may_start_with_double_dash() -> anyhow::Result<()> {
        let parsed = tokenize(r#"cat --prompt "--dramatic lighting" --seed '--5'"#)?;
        assert_eq!(
            parsed.flags,
            vec![
                flag("prompt", Some("--dramatic lighting")),
                flag("seed", Some("--5")),
            ]
        );
        Ok(())
    }

    #[test]
    fn quoted_flag_name_is_not_a_flag() {
        let err = tokenize(r#"cat "--seed" 5"#).unwrap_err();
        assert_eq!(
            err,
            ParamError::Parse("unexpected token '--seed'; quote values that contain spaces".to_string())
        );
    }

    #[test]
    fn bare_double_dash_is_rejected() {
        let err = tokenize("cat -- 16:9").unwrap_err();
        assert_eq!(err, ParamError::Parse("empty flag name '--'".to_string()));
    }
}
