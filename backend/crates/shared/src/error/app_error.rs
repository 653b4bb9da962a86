//! Application Error - Unified error type at the service edge
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias. Domain error
//! enums are converted into `AppError` right before they leave the service
//! (HTTP response, start-up failure), never the other way round.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use super::category::{Categorized, ErrorCategory};
use super::kind::ErrorKind;

/// アプリケーション統一エラー型
///
/// サービス境界で使用する標準エラー型です。
/// ビルダーパターンを使用してエラーを構築できます。
///
/// ## Fields
/// * `kind` - エラーの分類（HTTP ステータスコードにマッピング）
/// * `category` - 原因別の分類（ドメインエラーから変換された場合のみ）
/// * `operation` - 失敗したサービス操作の名前
/// * `message` - ユーザー向けのエラーメッセージ
/// * `source` - 元のエラー（オプション、デバッグ用、シリアライズされない）
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::AppError, kind::ErrorKind};
///
/// let err = AppError::new(ErrorKind::NotFound, "Progress not found")
///     .with_operation("get_progress");
/// assert_eq!(err.status_code(), 404);
/// assert_eq!(err.operation(), Some("get_progress"));
/// ```
pub struct AppError {
    /// エラー種別
    kind: ErrorKind,
    /// 原因別カテゴリ
    category: Option<ErrorCategory>,
    /// 失敗した操作
    operation: Option<&'static str>,
    /// ユーザー向けメッセージ
    message: Cow<'static, str>,
    /// 元のエラー（デバッグ用）
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

/// アプリケーション結果型エイリアス
///
/// `Result<T, AppError>` の省略形です。
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// 新しいエラーを作成
    ///
    /// ## Arguments
    /// * `kind` - エラー種別
    /// * `message` - ユーザー向けメッセージ
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            category: None,
            operation: None,
            message: message.into(),
            source: None,
        }
    }

    /// カテゴリ付きのドメインエラーから作成
    ///
    /// エラーの表示文字列をそのままメッセージとして使用します。
    ///
    /// ## Arguments
    /// * `err` - [`Categorized`] を実装したドメインエラー
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::{app_error::AppError, category::{Categorized, ErrorCategory}};
    ///
    /// #[derive(Debug)]
    /// struct Missing;
    /// impl std::fmt::Display for Missing {
    ///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    ///         f.write_str("course not found")
    ///     }
    /// }
    /// impl Categorized for Missing {
    ///     fn category(&self) -> ErrorCategory { ErrorCategory::NotFound }
    /// }
    ///
    /// let err = AppError::from_categorized(&Missing);
    /// assert_eq!(err.status_code(), 404);
    /// assert_eq!(err.message(), "course not found");
    /// ```
    pub fn from_categorized<E>(err: &E) -> Self
    where
        E: Categorized + fmt::Display + ?Sized,
    {
        let category = err.category();
        Self {
            kind: category.into(),
            category: Some(category),
            operation: None,
            message: Cow::Owned(err.to_string()),
            source: None,
        }
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    /// 400 Bad Request エラー
    #[inline]
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// 403 Forbidden エラー
    #[inline]
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// 404 Not Found エラー
    #[inline]
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// 409 Conflict エラー
    #[inline]
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// 422 Unprocessable Entity エラー
    #[inline]
    pub fn unprocessable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::UnprocessableEntity, message)
    }

    /// 500 Internal Server Error
    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    /// 503 Service Unavailable エラー
    #[inline]
    pub fn service_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// 失敗した操作名を設定
    ///
    /// ## Arguments
    /// * `operation` - サービス操作の名前（例: `get_progress`）
    #[inline]
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// 元のエラーを設定（デバッグ用）
    ///
    /// ## Arguments
    /// * `source` - 元のエラー
    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn category(&self) -> Option<ErrorCategory> {
        self.category
    }

    #[inline]
    pub fn operation(&self) -> Option<&'static str> {
        self.operation
    }

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.kind.is_server_error()
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        if let Some(category) = &self.category {
            builder.field("category", category);
        }
        if let Some(operation) = &self.operation {
            builder.field("operation", operation);
        }
        builder.field("message", &self.message);
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind)?;
        if let Some(operation) = self.operation {
            write!(f, "{}: ", operation)?;
        }
        f.write_str(&self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}
