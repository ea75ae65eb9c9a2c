use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct MessageForm {
    /// Raw input bound; the stored text is checked again after markup is stripped.
    #[validate(length(min = 1, max = 16000))]
    pub body: String,
}
