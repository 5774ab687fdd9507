/// Size summary shown under each assistant response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseStats {
    /// Unicode scalar values.
    pub chars: usize,
    pub words: usize,
    /// Rough estimate at four characters per token.
    pub estimated_tokens: usize,
}

impl ResponseStats {
    #[must_use]
    pub fn of(text: &str) -> Self {
        let chars = text.chars().count();
        Self {
            chars,
            words: text.split_whitespace().count(),
            estimated_tokens: chars.div_ceil(4),
        }
    }
}
