use serde::{Deserialize, Serialize};

pub mod binding;
pub mod info;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub reason: String,
}
