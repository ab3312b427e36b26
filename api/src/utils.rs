use tracing::error;

use crate::error::ApiError;

pub fn internal_error<T: std::fmt::Debug>(error: T) -> ApiError {
    error!("Internal error: {error:?}");
    ApiError::internal()
}

/// Splits a comma separated id list, dropping blanks and repeats.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();

    for id in raw.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        if !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_is_trimmed_and_deduplicated() {
        assert_eq!(parse_id_list(" a, b,,a ,c"), vec!["a", "b", "c"]);
        assert!(parse_id_list(" , ").is_empty());
    }
}
