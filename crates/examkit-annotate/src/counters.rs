//! Per-type sequence counter recovery from exported filenames.
//!
//! Counters are not persisted anywhere; they are re-derived by scanning the
//! output directory's filenames for each type's `_{type}_q{n}` marker. This
//! deliberately tolerates deleted files (the counter drops to the highest
//! survivor) at the cost of being fragile to renames.

use examkit_core::record::QuestionType;
use std::collections::HashMap;

/// Highest sequence number per question type found in `names`.
///
/// Only `.png` names are considered. A name that carries a type marker but
/// no parseable number is skipped with a logged warning; it never corrupts
/// the counts derived from other entries.
pub fn counters_from_filenames<'a, I>(names: I) -> HashMap<QuestionType, u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counters: HashMap<QuestionType, u32> = HashMap::new();

    for name in names {
        let Some(stem) = name
            .strip_suffix(".png")
            .or_else(|| name.strip_suffix(".PNG"))
        else {
            continue;
        };

        for question_type in QuestionType::ALL {
            let marker = format!("_{}_q", question_type.label());
            let Some(pos) = stem.find(&marker) else {
                continue;
            };
            let digits: String = stem[pos + marker.len()..]
                .chars()
                .take_while(|c| *c != '_')
                .collect();
            match digits.parse::<u32>() {
                Ok(number) => {
                    let entry = counters.entry(question_type).or_insert(0);
                    *entry = (*entry).max(number);
                }
                Err(_) => {
                    log::warn!("unparseable sequence number in filename: {name}");
                }
            }
        }
    }

    counters
}
