pub mod anthropic;
pub mod canonical;
pub mod downstream;
pub mod inbound;
pub mod prompt;
