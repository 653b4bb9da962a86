//! Error Category - Cause-based classification shared by domain errors
//!
//! Domain crates define their own closed error enums. Each one implements
//! [`Categorized`] so callers (HTTP layer, tests, other services) can ask
//! "is this a not-found?" without matching on every variant of every enum.

use serde::Serialize;

use super::kind::ErrorKind;

/// ドメインエラーの原因別分類
///
/// 各ドメインのエラー列挙体はこの分類のいずれかに属します。
/// HTTP 層では [`ErrorKind`] に変換されます。
///
/// ## Examples
/// ```rust
/// use kernel::error::{category::ErrorCategory, kind::ErrorKind};
///
/// assert_eq!(ErrorKind::from(ErrorCategory::Validation).status_code(), 422);
/// assert_eq!(ErrorKind::from(ErrorCategory::BusinessRule).status_code(), 409);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 参照したレコードが存在しない（またはテナントから見えない）
    NotFound,
    /// 一意キーが既に使用されている
    AlreadyExists,
    /// 入力の形式または範囲が不正
    Validation,
    /// 入力は正しいが、現在の状態では操作できない
    BusinessRule,
    /// 呼び出し元に操作の権限がない
    Authorization,
    /// ストレージまたは通信の障害
    Database,
}

impl ErrorCategory {
    /// レスポンスに載せる文字列表現を取得
    ///
    /// ## Returns
    /// `snake_case` のカテゴリ名
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::Validation => "validation",
            Self::BusinessRule => "business_rule",
            Self::Authorization => "authorization",
            Self::Database => "database",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorCategory> for ErrorKind {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::NotFound => ErrorKind::NotFound,
            ErrorCategory::AlreadyExists | ErrorCategory::BusinessRule => ErrorKind::Conflict,
            ErrorCategory::Validation => ErrorKind::UnprocessableEntity,
            ErrorCategory::Authorization => ErrorKind::Forbidden,
            ErrorCategory::Database => ErrorKind::InternalServerError,
        }
    }
}

/// ドメインエラー列挙体が実装する分類トレイト
///
/// ## Notes
/// * ラッパー列挙子（操作コンテキスト、入れ子のドメインエラー）は
///   内側のエラーに委譲すること。何重にラップしてもカテゴリが保たれる。
pub trait Categorized {
    fn category(&self) -> ErrorCategory;

    /// カテゴリから HTTP 向けのエラー種別を取得
    fn error_kind(&self) -> ErrorKind {
        self.category().into()
    }

    fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    fn is_already_exists(&self) -> bool {
        self.category() == ErrorCategory::AlreadyExists
    }

    fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    fn is_business_rule(&self) -> bool {
        self.category() == ErrorCategory::BusinessRule
    }

    fn is_authorization(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    fn is_database(&self) -> bool {
        self.category() == ErrorCategory::Database
    }
}
