//! Joining adjacent source-language fragments.
//!
//! Runs of two or more consecutive fragments of the same joinable kind are
//! merged into one fragment before compilation, so that e.g. several `.less`
//! files sharing variables compile as a unit. Fragments separated by a
//! fragment of another kind stay apart, which preserves the declared order
//! against interleaved plain files.

use crate::fragment::Fragment;

/// Merges maximal runs of adjacent same-kind joinable fragments.
///
/// Scans left to right in a single pass, writing into a fresh list. A run is
/// closed by the first fragment of a different kind and is never revisited.
pub fn join_adjacent(fragments: &[Fragment]) -> Vec<Fragment> {
    let mut joined = Vec::with_capacity(fragments.len());
    let mut i = 0;

    while i < fragments.len() {
        let first = &fragments[i];
        let run_len = if first.kind.is_joinable() {
            fragments[i..]
                .iter()
                .take_while(|f| f.kind == first.kind)
                .count()
        } else {
            1
        };

        if run_len < 2 {
            joined.push(first.clone());
        } else {
            let run = &fragments[i..i + run_len];
            let content = run.iter().flat_map(|f| f.content.iter().copied()).collect::<Vec<u8>>();
            joined.push(Fragment::new(first.kind, content, first.origin.clone()));
        }
        i += run_len;
    }

    joined
}
