/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub hearts: u32,
    pub currency: u32,
    pub hints_used: u32,
    pub is_complete: bool,
}
