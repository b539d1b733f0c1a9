//! Markdown document profile
//!
//! A single pass over the content body collecting the structural and
//! textual facts the heuristic backend builds its enrichments from.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// A run of content under one heading (or before the first heading).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: Option<String>,
    /// 0 for the preamble before any heading
    pub level: u8,
    pub words: usize,
}

/// Structural and textual facts about a markdown body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentProfile {
    pub sections: Vec<Section>,
    pub heading_levels: Vec<u8>,
    pub paragraphs: usize,
    pub lists: usize,
    pub list_items: usize,
    pub tables: usize,
    pub blockquotes: usize,
    pub images: usize,
    pub images_missing_alt: usize,
    /// Bold text spans, in document order
    pub strong_terms: Vec<String>,
    /// Plain text with block boundaries as newlines
    pub text: String,
}

impl DocumentProfile {
    /// Profile a markdown body.
    pub fn from_markdown(body: &str) -> Self {
        let mut profile = Self::default();
        let parser = Parser::new_ext(body, Options::all());

        let mut current = Section {
            heading: None,
            level: 0,
            words: 0,
        };
        let mut in_heading = false;
        let mut heading_text = String::new();
        let mut in_strong = false;
        let mut strong_text = String::new();
        let mut in_image = false;
        let mut image_alt = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    in_heading = true;
                    heading_text.clear();
                    profile.heading_levels.push(level as u8);
                }
                Event::End(TagEnd::Heading(level)) => {
                    in_heading = false;
                    let finished = std::mem::replace(
                        &mut current,
                        Section {
                            heading: Some(heading_text.trim().to_string()),
                            level: level as u8,
                            words: 0,
                        },
                    );
                    if finished.heading.is_some() || finished.words > 0 {
                        profile.sections.push(finished);
                    }
                    profile.text.push('\n');
                }
                Event::Start(Tag::Paragraph) => profile.paragraphs += 1,
                Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Item) => {
                    profile.text.push('\n')
                }
                Event::Start(Tag::List(_)) => profile.lists += 1,
                Event::Start(Tag::Item) => profile.list_items += 1,
                Event::Start(Tag::Table(_)) => profile.tables += 1,
                Event::Start(Tag::BlockQuote) => profile.blockquotes += 1,
                Event::Start(Tag::Strong) => {
                    in_strong = true;
                    strong_text.clear();
                }
                Event::End(TagEnd::Strong) => {
                    in_strong = false;
                    let term = strong_text.trim().trim_end_matches(':').trim().to_string();
                    if !term.is_empty() {
                        profile.strong_terms.push(term);
                    }
                }
                Event::Start(Tag::Image { .. }) => {
                    in_image = true;
                    image_alt.clear();
                    profile.images += 1;
                }
                Event::End(TagEnd::Image) => {
                    in_image = false;
                    if image_alt.trim().is_empty() {
                        profile.images_missing_alt += 1;
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if in_image {
                        image_alt.push_str(&text);
                        continue;
                    }
                    if in_heading {
                        heading_text.push_str(&text);
                    } else {
                        current.words += text.split_whitespace().count();
                    }
                    if in_strong {
                        strong_text.push_str(&text);
                    }
                    profile.text.push_str(&text);
                }
                Event::SoftBreak | Event::HardBreak => profile.text.push(' '),
                Event::End(TagEnd::TableCell) => profile.text.push(' '),
                Event::End(TagEnd::TableRow) | Event::End(TagEnd::TableHead) => {
                    profile.text.push('\n')
                }
                _ => {}
            }
        }

        if current.heading.is_some() || current.words > 0 {
            profile.sections.push(current);
        }
        profile
    }

    /// Total words outside headings
    pub fn word_count(&self) -> usize {
        self.sections.iter().map(|s| s.words).sum()
    }

    /// Sentences of the plain text, trimmed and non-empty.
    pub fn sentences(&self) -> Vec<&str> {
        self.text
            .split(|c| matches!(c, '.' | '!' | '?' | '\n'))
            .map(str::trim)
            .filter(|s| s.split_whitespace().count() >= 2)
            .collect()
    }

    /// Lowercased alphanumeric words of the plain text
    pub fn words(&self) -> Vec<String> {
        words_of(&self.text)
    }

    /// Number of places a heading jumps more than one level deeper.
    pub fn heading_skips(&self) -> usize {
        self.heading_levels
            .windows(2)
            .filter(|pair| pair[1] > pair[0] + 1)
            .count()
    }

    /// Numbers that follow a keyword such as `DC`, `AC` or `CR`
    /// (`DC 15`, `DC15`, `AC: 13`).
    pub fn values_after(&self, keyword: &str) -> Vec<u32> {
        let tokens = raw_tokens(&self.text);
        let mut values = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            if let Some(rest) = token.strip_prefix(keyword) {
                if rest.is_empty() {
                    if let Some(value) = tokens.get(i + 1).and_then(|t| leading_number(t)) {
                        values.push(value);
                    }
                } else if let Some(value) = leading_number(rest) {
                    values.push(value);
                }
            }
        }
        values
    }

    /// Every dice expression in the text, valid or not.
    pub fn dice_tokens(&self) -> Vec<String> {
        raw_tokens(&self.text)
            .into_iter()
            .filter(|t| looks_like_dice(t))
            .collect()
    }
}

/// A parsed dice expression like `2d6+3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

const STANDARD_DICE: [u32; 7] = [4, 6, 8, 10, 12, 20, 100];

impl DiceExpr {
    /// Uses a physical die and a sane count.
    pub fn is_standard(&self) -> bool {
        self.count >= 1 && self.count <= 40 && STANDARD_DICE.contains(&self.sides)
    }

    pub fn average(&self) -> f64 {
        self.count as f64 * (self.sides as f64 + 1.0) / 2.0 + self.modifier as f64
    }
}

/// Parse `NdS`, `dS`, `NdS+M` or `NdS-M`. Returns `None` for anything else.
pub fn parse_dice(token: &str) -> Option<DiceExpr> {
    let token = token.trim();
    let (count, rest) = token.split_once(['d', 'D'])?;
    let count = if count.is_empty() {
        1
    } else {
        count.parse().ok()?
    };

    let (sides, modifier) = match rest.find(['+', '-']) {
        Some(idx) => {
            let sides = &rest[..idx];
            let modifier: i32 = rest[idx + 1..].parse().ok()?;
            let modifier = if rest.as_bytes()[idx] == b'-' { -modifier } else { modifier };
            (sides, modifier)
        }
        None => (rest, 0),
    };
    let sides = sides.parse().ok()?;
    Some(DiceExpr {
        count,
        sides,
        modifier,
    })
}

fn looks_like_dice(token: &str) -> bool {
    let Some((count, rest)) = token.split_once(['d', 'D']) else {
        return false;
    };
    count.chars().all(|c| c.is_ascii_digit())
        && rest.chars().next().is_some_and(|c| c.is_ascii_digit())
        && rest.chars().all(|c| c.is_ascii_digit() || c == '+' || c == '-')
}

/// Whitespace tokens with surrounding punctuation removed, case preserved.
fn raw_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| {
                matches!(c, ',' | '.' | ';' | ':' | '(' | ')' | '[' | ']' | '"' | '\'')
            })
        })
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn leading_number(token: &str) -> Option<u32> {
    let digits: String = token
        .trim_start_matches(':')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Lowercased alphanumeric words
pub(crate) fn words_of(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Rough English syllable count, at least 1.
pub(crate) fn syllables(word: &str) -> usize {
    let mut count = 0;
    let mut prev_vowel = false;
    for c in word.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    if word.ends_with('e') && count > 1 && !word.ends_with("le") {
        count -= 1;
    }
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# The Drowned Chapel

Intro text before anything else happens.

## Arrival

> The air smells of brine and old incense.

**Sister Maren** greets the party. She asks for help.

### Encounter

- 3 ghouls (AC 12, HP 22)
- Attack: +4 to hit, 2d6+2 slashing. Resist with a DC 13 Constitution save.

![](map.png)

| Roll | Event |
|------|-------|
| 1 | Bells toll |
";

    #[test]
    fn profiles_structure() {
        let profile = DocumentProfile::from_markdown(SAMPLE);
        assert_eq!(profile.heading_levels, vec![1, 2, 3]);
        assert_eq!(profile.sections.len(), 3);
        assert_eq!(profile.sections[1].heading.as_deref(), Some("Arrival"));
        assert_eq!(profile.blockquotes, 1);
        assert_eq!(profile.lists, 1);
        assert_eq!(profile.list_items, 2);
        assert_eq!(profile.tables, 1);
        assert_eq!(profile.images, 1);
        assert_eq!(profile.images_missing_alt, 1);
        assert_eq!(profile.strong_terms, vec!["Sister Maren".to_string()]);
        assert_eq!(profile.heading_skips(), 0);
    }

    #[test]
    fn extracts_mechanics() {
        let profile = DocumentProfile::from_markdown(SAMPLE);
        assert_eq!(profile.values_after("DC"), vec![13]);
        assert_eq!(profile.values_after("AC"), vec![12]);
        assert_eq!(profile.values_after("HP"), vec![22]);
        assert_eq!(profile.dice_tokens(), vec!["2d6+2".to_string()]);
    }

    #[test]
    fn detects_heading_skips() {
        let profile = DocumentProfile::from_markdown("# Top\n\n### Too deep\n\ntext");
        assert_eq!(profile.heading_skips(), 1);
    }

    #[test]
    fn parses_dice_forms() {
        assert_eq!(
            parse_dice("2d6+3"),
            Some(DiceExpr {
                count: 2,
                sides: 6,
                modifier: 3
            })
        );
        assert_eq!(
            parse_dice("d20"),
            Some(DiceExpr {
                count: 1,
                sides: 20,
                modifier: 0
            })
        );
        assert_eq!(
            parse_dice("1d8-1"),
            Some(DiceExpr {
                count: 1,
                sides: 8,
                modifier: -1
            })
        );
        assert_eq!(parse_dice("dragon"), None);
        assert!(!parse_dice("3d7").unwrap().is_standard());
        assert_eq!(parse_dice("2d6+3").unwrap().average(), 10.0);
    }

    #[test]
    fn counts_syllables() {
        assert_eq!(syllables("cat"), 1);
        assert_eq!(syllables("dungeon"), 2);
        assert_eq!(syllables("table"), 2);
        assert_eq!(syllables("brine"), 1);
    }
}
