//! Character classes the tokenizer cares about.

/// Quote characters (after normalization).
pub const QUOTE: u8 = 0x1;
/// Opening and closing brackets.
pub const BRACKET: u8 = 0x2;
/// Punctuation that separates phrases.
pub const STOP: u8 = 0x4;
/// Punctuation that ends a sentence. Always comes together with [`STOP`].
pub const END_OF_SENTENCE: u8 = 0x8;

/// Classes stripped off word edges into complements.
pub const WORD_EDGE: u8 = QUOTE | BRACKET | STOP;

/// Look up the class bits of `ch`.
pub fn category(ch: char) -> u8 {
    match ch {
        '"' | '\'' | '‚' | '‹' | '›' => QUOTE,
        '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | '〈' | '〉' | '《' | '》' | '「' | '」'
        | '『' | '』' | '【' | '】' | '〔' | '〕' | '（' | '）' | '［' | '］' | '｛' | '｝' => {
            BRACKET
        }
        '.' | '!' | '?' | '…' | '‼' | '⁇' | '⁈' | '⁉' | '。' | '！' | '？' | '．' => {
            STOP | END_OF_SENTENCE
        }
        ',' | ';' | ':' | '-' | '–' | '—' | '·' | '¡' | '¿' | '、' | '，' | '；' | '：' | '･' => STOP,
        _ => 0,
    }
}

/// Map typographic quotes onto their ASCII counterparts.
pub fn normalize_quote(ch: char) -> char {
    match ch {
        '`' | '\u{91}' | '\u{92}' | '\u{2018}' | '\u{2019}' => '\'',
        '\u{93}' | '\u{94}' | '\u{AB}' | '\u{BB}' | '\u{201C}' | '\u{201D}' | '\u{201E}'
        | '\u{301D}' | '\u{301E}' | '\u{301F}' => '"',
        _ => ch,
    }
}

/// Whitespace that separates words.
pub fn is_space(ch: char) -> bool {
    ch.is_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funky_quotes_normalized() {
        let text: String = "«Hi» “there” ‘x’ `y".chars().map(normalize_quote).collect();
        assert_eq!(text, "\"Hi\" \"there\" 'x' 'y");
    }

    #[test]
    fn test_categories() {
        assert_eq!(category('.'), STOP | END_OF_SENTENCE);
        assert_eq!(category(','), STOP);
        assert_eq!(category('('), BRACKET);
        assert_eq!(category('"'), QUOTE);
        assert_eq!(category('a'), 0);
        assert_eq!(category('7'), 0);
    }
}
