//! Artifact filename rules.
//!
//! Each model directory must provide four artifacts. Files are matched against
//! an ordered table of `(role, pattern, priority)` rules; a file takes the role
//! of its best (lowest priority) matching rule, and each role takes its best
//! matching file. Exact names always outrank patterns.
//!
//! Nothing here touches the filesystem, so the rules are tested on plain
//! filename lists.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Role a file plays in a model directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactRole {
    Weights,
    Lexicon,
    SourceVocab,
    TargetVocab,
    /// A single vocabulary used for both directions. Only a fallback.
    SharedVocab,
}

impl ArtifactRole {
    /// The four roles a complete model directory must fill.
    pub const REQUIRED: [ArtifactRole; 4] = [
        ArtifactRole::Weights,
        ArtifactRole::Lexicon,
        ArtifactRole::SourceVocab,
        ArtifactRole::TargetVocab,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::Weights => "weights",
            ArtifactRole::Lexicon => "lexicon",
            ArtifactRole::SourceVocab => "source vocabulary",
            ArtifactRole::TargetVocab => "target vocabulary",
            ArtifactRole::SharedVocab => "shared vocabulary",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Exact(&'static str),
    Regex(&'static str),
}

/// Declarative rule table.
const RULES: &[(ArtifactRole, Pattern, u8)] = &[
    (ArtifactRole::Weights, Pattern::Exact("model.bin"), 0),
    (ArtifactRole::Lexicon, Pattern::Exact("lex.bin"), 0),
    (ArtifactRole::SourceVocab, Pattern::Exact("srcvocab.spm"), 0),
    (ArtifactRole::TargetVocab, Pattern::Exact("trgvocab.spm"), 0),
    (ArtifactRole::SharedVocab, Pattern::Exact("vocab.spm"), 0),
    // lex.50.50.enzh.s2t.bin
    (ArtifactRole::Lexicon, Pattern::Regex(r"(?i)^lex[._-].*\.bin$"), 10),
    // model.enzh.s2t.bin
    (ArtifactRole::Lexicon, Pattern::Regex(r"(?i)\.s2t\.bin$"), 11),
    (ArtifactRole::SourceVocab, Pattern::Regex(r"(?i)^srcvocab[._-].*\.spm$"), 10),
    (ArtifactRole::TargetVocab, Pattern::Regex(r"(?i)^trgvocab[._-].*\.spm$"), 10),
    (ArtifactRole::SharedVocab, Pattern::Regex(r"(?i)^vocab[._-].*\.spm$"), 10),
    // model.enzh.intgemm.alphas.bin
    (ArtifactRole::Weights, Pattern::Regex(r"(?i)^model[._-].*\.bin$"), 20),
    (ArtifactRole::Weights, Pattern::Regex(r"(?i)\.intgemm.*\.bin$"), 30),
    (ArtifactRole::SourceVocab, Pattern::Regex(r"(?i)^src.*\.(spm|vocab)$"), 40),
    (ArtifactRole::TargetVocab, Pattern::Regex(r"(?i)^(trg|tgt).*\.(spm|vocab)$"), 40),
    (ArtifactRole::SharedVocab, Pattern::Regex(r"(?i)\.(spm|vocab)$"), 50),
];

/// File extensions that can hold an artifact at all.
const ARTIFACT_EXTENSIONS: &[&str] = &["bin", "spm", "vocab"];

enum Matcher {
    Exact(&'static str),
    Regex(Regex),
}

struct CompiledRule {
    role: ArtifactRole,
    matcher: Matcher,
    priority: u8,
}

static COMPILED: OnceLock<Vec<CompiledRule>> = OnceLock::new();

fn compiled_rules() -> &'static [CompiledRule] {
    COMPILED.get_or_init(|| {
        let mut rules: Vec<CompiledRule> = RULES
            .iter()
            .map(|(role, pattern, priority)| CompiledRule {
                role: *role,
                matcher: match pattern {
                    Pattern::Exact(name) => Matcher::Exact(name),
                    Pattern::Regex(source) => Matcher::Regex(
                        Regex::new(source).expect("artifact patterns are valid regexes"),
                    ),
                },
                priority: *priority,
            })
            .collect();
        rules.sort_by_key(|rule| rule.priority);
        rules
    })
}

fn has_artifact_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            ARTIFACT_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Classify one filename. Returns the role of the best matching rule and its
/// priority, or `None` if the file is not an artifact.
pub fn classify(file_name: &str) -> Option<(ArtifactRole, u8)> {
    if !has_artifact_extension(file_name) {
        return None;
    }

    compiled_rules()
        .iter()
        .find(|rule| match &rule.matcher {
            Matcher::Exact(name) => *name == file_name,
            Matcher::Regex(regex) => regex.is_match(file_name),
        })
        .map(|rule| (rule.role, rule.priority))
}

/// Filenames chosen for each required role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFiles {
    pub weights: String,
    pub lexicon: String,
    pub source_vocab: String,
    pub target_vocab: String,
}

/// Pick one file per required role from a directory listing.
///
/// A shared vocabulary fills whichever vocabulary role has no dedicated file.
/// On failure returns the roles that stayed empty.
pub fn resolve<S: AsRef<str>>(file_names: &[S]) -> Result<ArtifactFiles, Vec<ArtifactRole>> {
    let mut best: Vec<(ArtifactRole, u8, &str)> = Vec::new();

    for name in file_names {
        let name = name.as_ref();
        let Some((role, priority)) = classify(name) else {
            continue;
        };

        match best.iter_mut().find(|(existing, _, _)| *existing == role) {
            // Ties go to the lexicographically smaller name so the outcome
            // does not depend on directory iteration order.
            Some(slot) if (priority, name) < (slot.1, slot.2) => *slot = (role, priority, name),
            Some(_) => {}
            None => best.push((role, priority, name)),
        }
    }

    let pick = |role: ArtifactRole| {
        best.iter()
            .find(|(candidate, _, _)| *candidate == role)
            .map(|(_, _, name)| name.to_string())
    };

    let shared = pick(ArtifactRole::SharedVocab);
    let weights = pick(ArtifactRole::Weights);
    let lexicon = pick(ArtifactRole::Lexicon);
    let source_vocab = pick(ArtifactRole::SourceVocab).or_else(|| shared.clone());
    let target_vocab = pick(ArtifactRole::TargetVocab).or_else(|| shared.clone());

    match (weights, lexicon, source_vocab, target_vocab) {
        (Some(weights), Some(lexicon), Some(source_vocab), Some(target_vocab)) => {
            Ok(ArtifactFiles {
                weights,
                lexicon,
                source_vocab,
                target_vocab,
            })
        }
        (weights, lexicon, source_vocab, target_vocab) => {
            let present = [
                weights.is_some(),
                lexicon.is_some(),
                source_vocab.is_some(),
                target_vocab.is_some(),
            ];
            Err(ArtifactRole::REQUIRED
                .iter()
                .zip(present)
                .filter(|(_, found)| !found)
                .map(|(role, _)| *role)
                .collect())
        }
    }
}
