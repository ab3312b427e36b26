use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DLQ_MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DlqState {
    pub last_received_at: Option<DateTime<Utc>>,
    pub last_consumed_at: Option<DateTime<Utc>>,
    pub total_messages: u64,
    pub unconsumed_messages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DlqMessage {
    pub component: String,
    pub error: String,
    pub original_message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DlqConsumeQuery {
    #[serde(default)]
    pub batch_size: Option<usize>,
}

/// Zero or missing means "as many as allowed".
pub fn dlq_batch_size(requested: Option<usize>) -> Result<usize, String> {
    match requested {
        None | Some(0) => Ok(DLQ_MAX_BATCH_SIZE),
        Some(n) if n > DLQ_MAX_BATCH_SIZE => Err(format!(
            "batch size cannot be greater than {DLQ_MAX_BATCH_SIZE}"
        )),
        Some(n) => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_bounds() {
        assert_eq!(dlq_batch_size(None), Ok(DLQ_MAX_BATCH_SIZE));
        assert_eq!(dlq_batch_size(Some(0)), Ok(DLQ_MAX_BATCH_SIZE));
        assert_eq!(dlq_batch_size(Some(7)), Ok(7));
        assert!(dlq_batch_size(Some(DLQ_MAX_BATCH_SIZE + 1)).is_err());
    }
}
