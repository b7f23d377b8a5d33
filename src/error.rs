pub type ViewsheetResult<T> = Result<T, ViewsheetError>;

#[derive(thiserror::Error, Debug)]
pub enum ViewsheetError {
    #[error("input error: {0}")]
    Input(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("render error for view '{view}': {message}")]
    ViewRender { view: String, message: String },

    #[error("composite error: {0}")]
    Composite(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ViewsheetError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn view_render(view: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ViewRender {
            view: view.into(),
            message: message.into(),
        }
    }

    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
