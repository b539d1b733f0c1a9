//! Heuristic backend: deterministic local enrichment
//!
//! Every stage is answered from a `DocumentProfile` of the content body plus
//! small keyword lexicons. No network, no randomness: the same input always
//! produces the same enrichment.

use super::profile::{parse_dice, syllables, words_of, DocumentProfile};
use super::{BackendError, EnrichmentBackend, EnrichmentRequest};
use crate::adapter::{ContentKind, EnhancementInput, StageId, StageOptions};
use crate::config::PerformanceMode;
use crate::stages::{
    solutions_for, AccessibilityAudit, CombatPlan, Difficulty, EditorialReview, LayoutPlan,
    MechanicsReport, NpcProfile, NpcRoster, PromptAnalysis, PromptComplexity, PuzzleDesign,
    PuzzleSolution, PuzzleSpec, SolutionApproach, TacticalPhase, AC_RANGE, DC_RANGE,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

const THEMES: &[(&str, &[&str])] = &[
    ("horror", &["undead", "ghost", "haunt", "crypt", "corpse", "ghoul", "dread", "blood"]),
    ("mystery", &["clue", "secret", "myster", "investigat", "hidden", "riddle", "missing"]),
    ("intrigue", &["noble", "court", "spy", "betray", "scheme", "politic", "guild"]),
    ("exploration", &["ruin", "map", "wilderness", "cave", "journey", "explor", "ancient"]),
    ("combat", &["battle", "fight", "ambush", "siege", "war", "raid"]),
    ("fey", &["fey", "enchant", "dream", "glamour", "wonder", "faerie"]),
    ("nautical", &["ship", "sea", "brine", "harbor", "harbour", "pirate", "drown", "tide"]),
];

const TONES: &[(&str, &[&str])] = &[
    ("grim", &["dark", "grim", "death", "blood", "despair", "drown", "rot", "dread"]),
    ("heroic", &["hero", "glory", "valor", "valour", "brave", "champion", "legend"]),
    ("lighthearted", &["funny", "whimsical", "silly", "laugh", "cheer", "festival", "prank"]),
];

const PROMPT_STOPWORDS: &[&str] = &[
    "about", "also", "could", "create", "from", "generate", "have", "into", "like", "make",
    "more", "over", "should", "some", "that", "their", "them", "there", "they", "this", "very",
    "what", "when", "where", "which", "while", "will", "with", "would", "write", "your",
];

const PUZZLE_WORDS: &[&str] = &[
    "puzzle", "riddle", "lock", "door", "seal", "rune", "trap", "cipher", "lever", "mechanism",
];

const TERRAIN_WORDS: &[&str] = &[
    "pillar", "bridge", "pit", "ledge", "water", "chasm", "altar", "fog", "rubble", "stair",
    "balcony", "brazier", "cover", "pew", "column", "ice", "mud",
];

const ROLE_WORDS: &[&str] = &[
    "innkeeper", "priest", "priestess", "merchant", "guard", "captain", "noble", "smith", "sage",
    "thief", "wizard", "knight", "farmer", "hunter", "sister", "brother", "mayor", "sailor",
];

/// Bold labels that introduce stat-block fields rather than characters
const STAT_LABELS: &[&str] = &[
    "actions", "armor class", "attack", "challenge", "damage", "hit points", "note", "reactions",
    "saving throws", "senses", "skills", "speed", "traits",
];

const MOTIVATIONS: &[&str] = &[
    "pay off a debt owed to dangerous people",
    "protect a younger sibling",
    "win back a lost reputation",
    "uncover who betrayed their mentor",
    "leave town before the truth comes out",
    "prove they deserve their title",
];

const SECRETS: &[&str] = &[
    "has been passing information to the villain",
    "knows where the missing relic really is",
    "is not who they claim to be",
    "caused the disaster everyone blames on someone else",
    "is slowly being possessed",
    "owes their life to the party's enemy",
];

const MANNERISMS: &[&str] = &[
    "taps two fingers on any surface while thinking",
    "answers questions with questions",
    "never makes eye contact with armed strangers",
    "hums old sea shanties under their breath",
    "keeps count of everything out loud",
    "laughs a beat too late at every joke",
];

const COLORS: &[&str] = &["red", "green", "blue", "yellow", "purple", "orange", "black", "white"];

const COLOR_OBJECTS: &[&str] = &[
    "one", "ones", "lever", "levers", "door", "doors", "button", "buttons", "rune", "runes", "gem",
    "gems", "switch", "key", "keys", "tile", "tiles", "crystal", "crystals",
];

const BE_VERBS: &[&str] = &["is", "are", "was", "were", "been", "being", "be"];

const LONG_SENTENCE_WORDS: usize = 30;
const LONG_SECTION_WORDS: usize = 400;
const WORDS_PER_PAGE: usize = 500;
const MAX_READING_GRADE: f64 = 9.0;
const MAX_NPCS: usize = 5;

/// Local, always-available backend built on document heuristics.
#[derive(Debug, Clone, Default)]
pub struct HeuristicBackend;

impl HeuristicBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EnrichmentBackend for HeuristicBackend {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn produce(
        &self,
        request: &EnrichmentRequest<'_>,
    ) -> Result<serde_json::Value, BackendError> {
        let input = request.input;
        let profile = DocumentProfile::from_markdown(&input.content.body);
        match request.stage {
            StageId::PromptAnalysis => encode(&analyze_prompt(input, &profile)),
            StageId::MultiSolutionPuzzles => {
                encode(&design_puzzles(input, &profile, request.options))
            }
            StageId::ProfessionalLayout => encode(&plan_layout(input, &profile)),
            StageId::NpcEnhancement => encode(&enrich_npcs(input, &profile)),
            StageId::TacticalCombat => encode(&plan_combat(input, &profile, request.options)),
            StageId::EditorialExcellence => encode(&review_prose(&profile)),
            StageId::Accessibility => encode(&audit_accessibility(&profile)),
            StageId::MechanicalValidation => encode(&check_mechanics(&profile)),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, BackendError> {
    serde_json::to_value(value).map_err(|e| BackendError::InvocationFailed(e.to_string()))
}

/// FNV-1a, for stable choices from fixed lists.
fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

fn pick<'a>(options: &[&'a str], seed: &str, salt: u64) -> &'a str {
    let idx = (fnv1a(seed).wrapping_add(salt) % options.len() as u64) as usize;
    options[idx]
}

fn stem(word: &str) -> String {
    word.chars().take(5).collect()
}

fn mentions(words: &[String], keyword: &str) -> bool {
    words.iter().any(|w| w.starts_with(keyword))
}

// --- prompt analysis ---

fn analyze_prompt(input: &EnhancementInput, profile: &DocumentProfile) -> PromptAnalysis {
    let mut body_words = profile.words();
    body_words.extend(words_of(&input.content.title));

    let themes: Vec<String> = THEMES
        .iter()
        .filter(|(_, keys)| keys.iter().any(|k| mentions(&body_words, k)))
        .map(|(theme, _)| theme.to_string())
        .collect();

    let tone = TONES
        .iter()
        .map(|(tone, keys)| (tone, keys.iter().filter(|k| mentions(&body_words, k)).count()))
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits)
        .map(|(tone, _)| tone.to_string())
        .unwrap_or_else(|| "neutral".to_string());

    let mut seen = HashSet::new();
    let terms: Vec<String> = words_of(&input.context.prompt)
        .into_iter()
        .filter(|w| w.chars().count() >= 4 && !PROMPT_STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect();

    let body_stems: HashSet<String> = body_words.iter().map(|w| stem(w)).collect();
    let (covered_terms, missing_terms): (Vec<String>, Vec<String>) =
        terms.iter().cloned().partition(|t| body_stems.contains(&stem(t)));

    let prompt_coverage = if terms.is_empty() {
        1.0
    } else {
        covered_terms.len() as f64 / terms.len() as f64
    };

    let complexity = match terms.len() {
        n if n < 5 => PromptComplexity::Simple,
        n if n < 12 => PromptComplexity::Moderate,
        _ => PromptComplexity::Complex,
    };

    let mut recommendations: Vec<String> = missing_terms
        .iter()
        .map(|t| format!("Work '{}' from the prompt into the content", t))
        .collect();
    if themes.is_empty() {
        recommendations.push("Commit to a clear theme the table can feel".to_string());
    }

    PromptAnalysis {
        themes,
        tone,
        complexity,
        prompt_coverage,
        covered_terms,
        missing_terms,
        recommendations,
    }
}

// --- puzzles ---

fn design_puzzles(
    input: &EnhancementInput,
    profile: &DocumentProfile,
    options: &StageOptions,
) -> PuzzleDesign {
    let mut titles: Vec<String> = profile
        .sections
        .iter()
        .filter_map(|s| s.heading.as_ref())
        .filter(|h| {
            let lower = h.to_lowercase();
            PUZZLE_WORDS.iter().any(|w| lower.contains(w))
        })
        .cloned()
        .collect();
    if titles.is_empty() {
        titles.push(input.content.title.clone());
    }

    let base_dc = 12 + input.context.party_level.unwrap_or(3) as u32 / 4;
    let count = solutions_for(options.performance_mode);
    let hint_count = match options.performance_mode {
        PerformanceMode::Speed => 1,
        PerformanceMode::Balanced => 2,
        PerformanceMode::Quality => 3,
    };

    let puzzles = titles
        .into_iter()
        .map(|title| {
            let solutions = [
                SolutionApproach::Logic,
                SolutionApproach::Skill,
                SolutionApproach::Social,
                SolutionApproach::Magic,
                SolutionApproach::Force,
            ]
            .into_iter()
            .take(count)
            .map(|approach| solution(approach, &title, base_dc))
            .collect();
            let hints = [
                format!(
                    "A worn inscription near {} repeats one symbol more than the others",
                    title
                ),
                format!("Scratches on the floor show where {} was forced open before", title),
                format!("A survivor's journal describes the first step of solving {}", title),
            ]
            .into_iter()
            .take(hint_count)
            .collect();
            PuzzleSpec {
                fail_forward: Some(format!(
                    "{} gives way anyway, but the noise alerts whatever waits beyond",
                    title
                )),
                title,
                solutions,
                hints,
            }
        })
        .collect();

    PuzzleDesign { puzzles }
}

fn solution(approach: SolutionApproach, title: &str, base_dc: u32) -> PuzzleSolution {
    let (description, check) = match approach {
        SolutionApproach::Logic => (
            format!("Work out the pattern behind {} from clues in the room", title),
            format!("Intelligence (Investigation) DC {}", base_dc),
        ),
        SolutionApproach::Skill => (
            format!("Bypass {} with tools, climbing or quick hands", title),
            format!("Dexterity (Thieves' Tools) DC {}", base_dc + 2),
        ),
        SolutionApproach::Social => (
            format!("Coax the answer to {} from someone who knows it", title),
            format!("Charisma (Persuasion) DC {}", base_dc + 1),
        ),
        SolutionApproach::Magic => (
            format!("Unravel the enchantment binding {}", title),
            format!("Intelligence (Arcana) DC {}", base_dc + 2),
        ),
        SolutionApproach::Force => (
            format!("Break through {} at a cost in time, noise or hit points", title),
            format!("Strength (Athletics) DC {}", base_dc + 5),
        ),
    };
    PuzzleSolution {
        approach,
        description,
        check: Some(check),
    }
}

// --- layout ---

fn plan_layout(input: &EnhancementInput, profile: &DocumentProfile) -> LayoutPlan {
    let words = profile.word_count();
    let mut issues = Vec::new();

    if profile.heading_levels.is_empty() {
        issues.push("No headings: break the content into titled sections".to_string());
    }
    for section in &profile.sections {
        if section.words > LONG_SECTION_WORDS {
            issues.push(format!(
                "Section '{}' runs {} words; split it or move detail into a table",
                section.heading.as_deref().unwrap_or("(untitled)"),
                section.words
            ));
        }
    }
    if input.content.kind == ContentKind::Adventure && profile.blockquotes == 0 {
        issues.push("No read-aloud text: box the descriptions players hear".to_string());
    }

    LayoutPlan {
        sections: profile.sections.clone(),
        read_aloud_blocks: profile.blockquotes,
        tables: profile.tables,
        lists: profile.lists,
        max_heading_depth: profile.heading_levels.iter().copied().max().unwrap_or(0),
        estimated_pages: words.div_ceil(WORDS_PER_PAGE).max(1) as u32,
        issues,
    }
}

// --- npcs ---

fn enrich_npcs(input: &EnhancementInput, profile: &DocumentProfile) -> NpcRoster {
    let mut seen = HashSet::new();
    let mut names: Vec<String> = profile
        .strong_terms
        .iter()
        .filter(|term| looks_like_name(term))
        .filter(|term| seen.insert(term.to_string()))
        .take(MAX_NPCS)
        .cloned()
        .collect();
    if names.is_empty() && input.content.kind == ContentKind::Npc {
        names.push(input.content.title.clone());
    }

    let sentences = profile.sentences();
    let npcs = names
        .into_iter()
        .map(|name| {
            let role = sentences
                .iter()
                .filter(|s| s.contains(name.as_str()))
                .flat_map(|s| words_of(s))
                .find(|w| ROLE_WORDS.contains(&w.as_str()))
                .unwrap_or_else(|| {
                    pick(&["informant", "local contact", "rival", "patron"], &name, 0).to_string()
                });
            let hooks = vec![
                format!("{} offers a reward for help with a problem they cannot solve alone", name),
                format!("{} has seen something the party needs to know", name),
            ];
            NpcProfile {
                motivation: pick(MOTIVATIONS, &name, 1).to_string(),
                secret: pick(SECRETS, &name, 2).to_string(),
                mannerism: pick(MANNERISMS, &name, 3).to_string(),
                role,
                hooks,
                name,
            }
        })
        .collect();

    NpcRoster { npcs }
}

fn looks_like_name(term: &str) -> bool {
    let starts_upper = term.chars().next().is_some_and(char::is_uppercase);
    let words = term.split_whitespace().count();
    starts_upper && (1..=4).contains(&words) && !STAT_LABELS.contains(&term.to_lowercase().as_str())
}

// --- combat ---

fn plan_combat(
    input: &EnhancementInput,
    profile: &DocumentProfile,
    options: &StageOptions,
) -> CombatPlan {
    let challenge_ratings = profile.values_after("CR");
    let armor_classes = profile.values_after("AC");
    let difficulty = Difficulty::rate(
        &challenge_ratings,
        input.context.party_level,
        input.context.party_size,
    );

    let words = profile.words();
    let terrain_features: Vec<String> = TERRAIN_WORDS
        .iter()
        .filter(|t| mentions(&words, t))
        .map(|t| t.to_string())
        .collect();

    let opening = match terrain_features.first() {
        Some(feature) => format!("Opens from behind the {} and uses it as cover", feature),
        None => "Rushes the nearest character to split the party".to_string(),
    };
    let mut phases = vec![
        TacticalPhase {
            trigger: "Round 1".to_string(),
            behavior: opening,
        },
        TacticalPhase {
            trigger: "First creature drops or the leader is bloodied".to_string(),
            behavior: "Regroups and focuses the weakest-looking character".to_string(),
        },
        TacticalPhase {
            trigger: "Reduced to a quarter of its strength".to_string(),
            behavior: "Flees, surrenders or makes a desperate last stand".to_string(),
        },
    ];
    if options.performance_mode == PerformanceMode::Speed {
        phases.truncate(2);
    }

    let mut recommendations = Vec::new();
    match difficulty {
        Difficulty::Unknown => recommendations
            .push("State challenge ratings and party level so difficulty can be rated".to_string()),
        Difficulty::Deadly => recommendations
            .push("Deadly for this party: offer an escape route or thin the numbers".to_string()),
        Difficulty::Trivial => recommendations
            .push("Trivial for this party: add reinforcements or a hazard".to_string()),
        _ => {}
    }
    if terrain_features.is_empty() {
        recommendations
            .push("Add terrain worth fighting over: cover, elevation or hazards".to_string());
    }

    CombatPlan {
        difficulty,
        challenge_ratings,
        armor_classes,
        terrain_features,
        phases,
        recommendations,
    }
}

// --- readability ---

struct TextStats {
    words: usize,
    sentences: usize,
    syllables: usize,
}

impl TextStats {
    fn of(profile: &DocumentProfile) -> Self {
        let words = profile.words();
        Self {
            words: words.len(),
            sentences: profile.sentences().len().max(1),
            syllables: words.iter().map(|w| syllables(w)).sum(),
        }
    }

    fn words_per_sentence(&self) -> f64 {
        self.words as f64 / self.sentences as f64
    }

    fn syllables_per_word(&self) -> f64 {
        if self.words == 0 {
            0.0
        } else {
            self.syllables as f64 / self.words as f64
        }
    }

    /// Flesch reading ease, clamped to [0, 100]
    fn reading_ease(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        (206.835 - 1.015 * self.words_per_sentence() - 84.6 * self.syllables_per_word())
            .clamp(0.0, 100.0)
    }

    /// Flesch-Kincaid grade, never negative
    fn grade(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        (0.39 * self.words_per_sentence() + 11.8 * self.syllables_per_word() - 15.59).max(0.0)
    }
}

// --- editorial ---

fn review_prose(profile: &DocumentProfile) -> EditorialReview {
    let stats = TextStats::of(profile);
    let words = profile.words();
    let sentences = profile.sentences();

    let long_sentences = sentences
        .iter()
        .filter(|s| s.split_whitespace().count() > LONG_SENTENCE_WORDS)
        .count();

    let mut repeated_words = Vec::new();
    for pair in words.windows(2) {
        if pair[0] == pair[1] && !repeated_words.contains(&pair[0]) {
            repeated_words.push(pair[0].clone());
        }
    }

    let passive_constructions = words
        .windows(2)
        .filter(|pair| {
            BE_VERBS.contains(&pair[0].as_str()) && pair[1].len() > 3 && pair[1].ends_with("ed")
        })
        .count();

    let mut suggestions = Vec::new();
    if long_sentences > 0 {
        suggestions.push(format!(
            "Split {} sentence(s) longer than {} words",
            long_sentences, LONG_SENTENCE_WORDS
        ));
    }
    for word in &repeated_words {
        suggestions.push(format!("Remove the doubled '{}'", word));
    }
    if passive_constructions > 0 {
        suggestions.push(format!(
            "Rewrite {} passive construction(s) in the active voice",
            passive_constructions
        ));
    }

    EditorialReview {
        word_count: stats.words,
        sentence_count: stats.sentences,
        average_sentence_length: stats.words_per_sentence(),
        long_sentences,
        readability: stats.reading_ease(),
        repeated_words,
        passive_constructions,
        suggestions,
    }
}

// --- accessibility ---

fn audit_accessibility(profile: &DocumentProfile) -> AccessibilityAudit {
    let stats = TextStats::of(profile);
    let words = profile.words();
    let color_only_cues = words
        .windows(2)
        .filter(|pair| {
            COLORS.contains(&pair[0].as_str()) && COLOR_OBJECTS.contains(&pair[1].as_str())
        })
        .count();
    let heading_skips = profile.heading_skips();
    let reading_grade = stats.grade();

    let mut issues = Vec::new();
    if profile.images_missing_alt > 0 {
        issues.push(format!("{} image(s) have no alt text", profile.images_missing_alt));
    }
    if heading_skips > 0 {
        issues.push(format!("Heading levels skip {} time(s)", heading_skips));
    }
    if color_only_cues > 0 {
        issues.push(format!(
            "{} element(s) told apart by colour alone; add a shape, label or position",
            color_only_cues
        ));
    }
    if reading_grade > MAX_READING_GRADE {
        issues.push(format!(
            "Reading grade {:.1} is above {}; shorten sentences and words",
            reading_grade, MAX_READING_GRADE
        ));
    }

    AccessibilityAudit {
        images: profile.images,
        images_missing_alt: profile.images_missing_alt,
        heading_skips,
        color_only_cues,
        reading_grade,
        issues,
    }
}

// --- mechanics ---

fn check_mechanics(profile: &DocumentProfile) -> MechanicsReport {
    let dice = profile.dice_tokens();
    let invalid_dice: Vec<String> = dice
        .iter()
        .filter(|t| !parse_dice(t).is_some_and(|d| d.is_standard()))
        .cloned()
        .collect();

    let difficulty_classes = profile.values_after("DC");
    let out_of_range_dcs: Vec<u32> = difficulty_classes
        .iter()
        .copied()
        .filter(|dc| !DC_RANGE.contains(dc))
        .collect();
    let armor_classes = profile.values_after("AC");
    let out_of_range_acs: Vec<u32> = armor_classes
        .iter()
        .copied()
        .filter(|ac| !AC_RANGE.contains(ac))
        .collect();

    let mut issues: Vec<String> = invalid_dice
        .iter()
        .map(|t| format!("Nonstandard dice expression: {}", t))
        .collect();
    issues.extend(out_of_range_dcs.iter().map(|dc| {
        format!("DC {} is outside {}-{}", dc, DC_RANGE.start(), DC_RANGE.end())
    }));
    issues.extend(out_of_range_acs.iter().map(|ac| {
        format!("AC {} is outside {}-{}", ac, AC_RANGE.start(), AC_RANGE.end())
    }));

    MechanicsReport {
        checks_performed: dice.len() + difficulty_classes.len() + armor_classes.len(),
        dice_checked: dice.len(),
        invalid_dice,
        difficulty_classes,
        out_of_range_dcs,
        armor_classes,
        out_of_range_acs,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ContentItem, GenerationContext};
    use crate::backend::decode;

    const CHAPEL: &str = "\
# The Drowned Chapel

The chapel sank beneath the tide a century ago. Its bells still ring at low water.

## Arrival

> The air smells of brine and old incense. Water laps at the broken pews.

**Sister Maren** is the last priest of the chapel. She asks the party to recover the relic.

## The Rune Door

Three runes glow on a sealed door. Pressing the red rune floods the nave.

## The Nave

Two ghouls (CR 1, AC 12) lurk among the pillars. Their claws deal 2d6+2 slashing damage.
A creature must succeed on a DC 13 Constitution save or be paralyzed.
";

    fn input(kind: ContentKind) -> EnhancementInput {
        EnhancementInput::new(
            ContentItem::new(kind, "The Drowned Chapel", CHAPEL),
            GenerationContext::new("A haunted chapel beneath the sea with ghouls and a relic")
                .with_party(3, 4),
        )
    }

    async fn produce(stage: StageId, input: &EnhancementInput) -> serde_json::Value {
        let options = StageOptions::default();
        let request = EnrichmentRequest::new(stage, input, &options);
        HeuristicBackend::new().produce(&request).await.unwrap()
    }

    #[tokio::test]
    async fn prompt_coverage_finds_missing_terms() {
        let input = input(ContentKind::Adventure);
        let analysis: PromptAnalysis =
            decode(produce(StageId::PromptAnalysis, &input).await).unwrap();

        assert!(analysis.covered_terms.contains(&"chapel".to_string()));
        assert!(analysis.covered_terms.contains(&"relic".to_string()));
        assert!(analysis.missing_terms.contains(&"haunted".to_string()));
        assert!(analysis.themes.contains(&"nautical".to_string()));
        assert!(analysis.prompt_coverage > 0.5 && analysis.prompt_coverage < 1.0);
    }

    #[tokio::test]
    async fn puzzles_come_from_puzzle_headings() {
        let input = input(ContentKind::Adventure);
        let design: PuzzleDesign =
            decode(produce(StageId::MultiSolutionPuzzles, &input).await).unwrap();

        assert_eq!(design.puzzles.len(), 1);
        assert_eq!(design.puzzles[0].title, "The Rune Door");
        assert_eq!(design.puzzles[0].solutions.len(), 3);
        assert!(design.puzzles[0].fail_forward.is_some());
    }

    #[tokio::test]
    async fn npcs_come_from_bold_names() {
        let input = input(ContentKind::Adventure);
        let roster: NpcRoster = decode(produce(StageId::NpcEnhancement, &input).await).unwrap();

        assert_eq!(roster.npcs.len(), 1);
        assert_eq!(roster.npcs[0].name, "Sister Maren");
        assert_eq!(roster.npcs[0].role, "sister");
        assert!(!roster.npcs[0].secret.is_empty());

        // Same input, same choices
        let again: NpcRoster = decode(produce(StageId::NpcEnhancement, &input).await).unwrap();
        assert_eq!(roster, again);
    }

    #[tokio::test]
    async fn combat_rates_difficulty_and_terrain() {
        let input = input(ContentKind::Adventure);
        let plan: CombatPlan = decode(produce(StageId::TacticalCombat, &input).await).unwrap();

        assert_eq!(plan.challenge_ratings, vec![1]);
        assert_eq!(plan.armor_classes, vec![12]);
        assert_eq!(plan.difficulty, Difficulty::Trivial);
        assert!(plan.terrain_features.contains(&"pillar".to_string()));
        assert_eq!(plan.phases.len(), 3);
    }

    #[tokio::test]
    async fn combat_survives_absurd_challenge_ratings() {
        let input = EnhancementInput::new(
            ContentItem::new(
                ContentKind::Encounter,
                "Titans",
                "Two titans (CR 4000000000) and (CR 4000000000) guard the pillar bridge.",
            ),
            GenerationContext::new("titans").with_party(5, 4),
        );
        let plan: CombatPlan = decode(produce(StageId::TacticalCombat, &input).await).unwrap();

        assert_eq!(plan.challenge_ratings, vec![4_000_000_000, 4_000_000_000]);
        assert_eq!(plan.difficulty, Difficulty::Deadly);
    }

    #[tokio::test]
    async fn layout_counts_read_aloud_and_pages() {
        let input = input(ContentKind::Adventure);
        let plan: LayoutPlan = decode(produce(StageId::ProfessionalLayout, &input).await).unwrap();

        assert_eq!(plan.read_aloud_blocks, 1);
        assert_eq!(plan.estimated_pages, 1);
        assert_eq!(plan.max_heading_depth, 2);
        assert!(plan.issues.is_empty());
    }

    #[tokio::test]
    async fn layout_flags_missing_structure() {
        let input = EnhancementInput::new(
            ContentItem::new(ContentKind::Adventure, "Flat", "Just one paragraph of text."),
            GenerationContext::new("anything"),
        );
        let plan: LayoutPlan = decode(produce(StageId::ProfessionalLayout, &input).await).unwrap();
        assert_eq!(plan.issues.len(), 2);
    }

    #[tokio::test]
    async fn accessibility_flags_colour_cues() {
        let input = input(ContentKind::Adventure);
        let audit: AccessibilityAudit =
            decode(produce(StageId::Accessibility, &input).await).unwrap();
        assert_eq!(audit.color_only_cues, 1);
        assert!(!audit.issues.is_empty());
    }

    #[tokio::test]
    async fn editorial_finds_doubled_words() {
        let input = EnhancementInput::new(
            ContentItem::new(
                ContentKind::Other,
                "Notes",
                "The the door was opened by the guard. It creaks loudly when the wind blows hard.",
            ),
            GenerationContext::new("notes"),
        );
        let review: EditorialReview =
            decode(produce(StageId::EditorialExcellence, &input).await).unwrap();
        assert_eq!(review.repeated_words, vec!["the".to_string()]);
        assert_eq!(review.passive_constructions, 1);
        assert_eq!(review.sentence_count, 2);
        assert!(review.readability > 0.0);
    }

    #[tokio::test]
    async fn mechanics_flags_odd_dice_and_dcs() {
        let input = EnhancementInput::new(
            ContentItem::new(
                ContentKind::Monster,
                "Ooze",
                "Pseudopod: 3d7 acid damage. Escape requires a DC 45 Strength check. AC 8.",
            ),
            GenerationContext::new("an ooze"),
        );
        let report: MechanicsReport =
            decode(produce(StageId::MechanicalValidation, &input).await).unwrap();
        assert_eq!(report.invalid_dice, vec!["3d7".to_string()]);
        assert_eq!(report.out_of_range_dcs, vec![45]);
        assert!(report.out_of_range_acs.is_empty());
        assert_eq!(report.checks_performed, 3);
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn fnv_is_stable() {
        assert_eq!(fnv1a(""), 0xcbf29ce484222325);
        assert_eq!(pick(MOTIVATIONS, "Maren", 1), pick(MOTIVATIONS, "Maren", 1));
    }
}
