pub mod answer;
pub mod context;
pub mod drill;
pub mod hint;
pub mod init;
pub mod next;
pub mod stats;
pub mod validate;
pub mod vocab;
