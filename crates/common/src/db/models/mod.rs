//! SeaORM entity models
//!
//! Database entities for Lumen

pub mod feedback;
pub mod image_analysis;
pub mod image_submission;
pub mod text_analysis;
pub mod text_submission;
pub mod user;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use text_submission::{
    Entity as TextSubmissionEntity,
    Model as TextSubmission,
    ActiveModel as TextSubmissionActiveModel,
    Column as TextSubmissionColumn,
};

pub use text_analysis::{
    Entity as TextAnalysisEntity,
    Model as TextAnalysis,
    ActiveModel as TextAnalysisActiveModel,
    Column as TextAnalysisColumn,
};

pub use image_submission::{
    Entity as ImageSubmissionEntity,
    Model as ImageSubmission,
    ActiveModel as ImageSubmissionActiveModel,
    Column as ImageSubmissionColumn,
};

pub use image_analysis::{
    Entity as ImageAnalysisEntity,
    Model as ImageAnalysis,
    ActiveModel as ImageAnalysisActiveModel,
    Column as ImageAnalysisColumn,
};

pub use feedback::{
    Entity as FeedbackEntity,
    Model as Feedback,
    ActiveModel as FeedbackActiveModel,
    Column as FeedbackColumn,
    AnalysisKind,
    FeedbackStatus,
    Rating,
};
