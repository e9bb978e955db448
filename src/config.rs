use crate::source::DEFAULT_TAB_WIDTH;

/// Knobs shared by the driver and the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Columns a tab advances to; only affects reported positions.
    pub tab_width: usize,
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_bytecode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            dump_tokens: false,
            dump_ast: false,
            dump_bytecode: false,
        }
    }
}

impl Config {
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }
}
