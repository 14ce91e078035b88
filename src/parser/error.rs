use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no text block of at least {threshold} characters")]
    NoContentFound { threshold: usize },
    #[error("long text blocks share no common ancestor")]
    NoCommonAncestor,
    /// Only ever logged; a missing title does not fail the parse.
    #[error("document has no heading to take a title from")]
    TitleUnresolvable,
}
