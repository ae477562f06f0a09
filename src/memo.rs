//! Transaction memos and their validation rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ViewerError;

/// Longest text memo the ledger accepts, in bytes
pub const MAX_TEXT_MEMO_BYTES: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoKind {
    #[default]
    None,
    Text,
    Id,
    Hash,
    Return,
}

impl fmt::Display for MemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoKind::None => "none",
            MemoKind::Text => "text",
            MemoKind::Id => "id",
            MemoKind::Hash => "hash",
            MemoKind::Return => "return",
        };
        f.write_str(name)
    }
}

impl FromStr for MemoKind {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(MemoKind::None),
            "text" => Ok(MemoKind::Text),
            "id" => Ok(MemoKind::Id),
            "hash" => Ok(MemoKind::Hash),
            "return" => Ok(MemoKind::Return),
            other => Err(ViewerError::InvalidMemo(format!("unknown memo type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Memo {
    #[default]
    None,
    Text(String),
    Id(u64),
    Hash([u8; 32]),
    Return([u8; 32]),
}

impl Memo {
    /// Validate user-typed memo content for the selected kind
    pub fn parse(kind: MemoKind, content: &str) -> Result<Memo, ViewerError> {
        match kind {
            MemoKind::None => Ok(Memo::None),
            MemoKind::Text => {
                if content.is_empty() {
                    return Err(ViewerError::InvalidMemo("memo text is empty".to_string()));
                }
                if content.len() > MAX_TEXT_MEMO_BYTES {
                    return Err(ViewerError::InvalidMemo(format!(
                        "memo text must be {} bytes or fewer",
                        MAX_TEXT_MEMO_BYTES
                    )));
                }
                Ok(Memo::Text(content.to_string()))
            }
            MemoKind::Id => {
                let trimmed = content.trim();
                if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ViewerError::InvalidMemo(
                        "memo ID must be a positive whole number".to_string(),
                    ));
                }
                trimmed.parse::<u64>().map(Memo::Id).map_err(|_| {
                    ViewerError::InvalidMemo("memo ID is larger than 64 bits".to_string())
                })
            }
            MemoKind::Hash => parse_hash(content).map(Memo::Hash),
            MemoKind::Return => parse_hash(content).map(Memo::Return),
        }
    }

    pub fn kind(&self) -> MemoKind {
        match self {
            Memo::None => MemoKind::None,
            Memo::Text(_) => MemoKind::Text,
            Memo::Id(_) => MemoKind::Id,
            Memo::Hash(_) => MemoKind::Hash,
            Memo::Return(_) => MemoKind::Return,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Memo::None)
    }

    /// Content as the user would have typed it
    pub fn content(&self) -> String {
        match self {
            Memo::None => String::new(),
            Memo::Text(text) => text.clone(),
            Memo::Id(id) => id.to_string(),
            Memo::Hash(bytes) | Memo::Return(bytes) => hex::encode(bytes),
        }
    }
}

fn parse_hash(content: &str) -> Result<[u8; 32], ViewerError> {
    let trimmed = content.trim();
    if trimmed.len() != 64 {
        return Err(ViewerError::InvalidMemo(
            "memo hash must be 64 hexadecimal characters".to_string(),
        ));
    }
    let bytes = hex::decode(trimmed).map_err(|_| {
        ViewerError::InvalidMemo("memo hash must be 64 hexadecimal characters".to_string())
    })?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_memo_limit_is_bytes() {
        assert!(Memo::parse(MemoKind::Text, &"a".repeat(28)).is_ok());
        assert!(Memo::parse(MemoKind::Text, &"a".repeat(29)).is_err());
        // 10 two-byte characters + 9 ASCII = 29 bytes
        let mixed = format!("{}{}", "é".repeat(10), "a".repeat(9));
        assert!(Memo::parse(MemoKind::Text, &mixed).is_err());
        assert!(Memo::parse(MemoKind::Text, "").is_err());
    }

    #[test]
    fn test_id_memo() {
        assert_eq!(Memo::parse(MemoKind::Id, "12345").unwrap(), Memo::Id(12345));
        assert_eq!(
            Memo::parse(MemoKind::Id, "18446744073709551615").unwrap(),
            Memo::Id(u64::MAX)
        );
        assert!(Memo::parse(MemoKind::Id, "18446744073709551616").is_err());
        assert!(Memo::parse(MemoKind::Id, "-1").is_err());
        assert!(Memo::parse(MemoKind::Id, "12a").is_err());
    }

    #[test]
    fn test_hash_memo() {
        let hex = "ab".repeat(32);
        let memo = Memo::parse(MemoKind::Return, &hex).unwrap();
        assert_eq!(memo.kind(), MemoKind::Return);
        assert_eq!(memo.content(), hex);
        assert!(Memo::parse(MemoKind::Hash, &"ab".repeat(31)).is_err());
        assert!(Memo::parse(MemoKind::Hash, &"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_memo_kind_parsing() {
        assert_eq!("TEXT".parse::<MemoKind>().unwrap(), MemoKind::Text);
        assert_eq!("".parse::<MemoKind>().unwrap(), MemoKind::None);
        assert!("blob".parse::<MemoKind>().is_err());
    }
}
