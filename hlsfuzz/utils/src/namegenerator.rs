use crate::Id;
use std::collections::HashMap;

/// Per-prefix counter that hands out monotonically numbered names.
///
/// Every prefix owns its own counter, so the names of one node kind never
/// depend on how many nodes of another kind exist:
/// ```
/// # use hlsfuzz_utils::NameGenerator;
/// let mut namegen = NameGenerator::default();
/// assert_eq!(namegen.gen_name("op_"), "op_0");
/// assert_eq!(namegen.gen_name("loop_"), "loop_0");
/// assert_eq!(namegen.gen_name("op_"), "op_1");
/// ```
/// Counters only ever increase, so a name is never handed out twice.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    counters: HashMap<&'static str, u64>,
}

impl NameGenerator {
    /// Returns a new name that starts with `prefix`.
    pub fn gen_name(&mut self, prefix: &'static str) -> Id {
        let count = self.counters.entry(prefix).or_insert(0);
        let name = Id::from(format!("{prefix}{count}"));
        *count += 1;
        name
    }
}
