pub mod domain;
pub mod keystore;
pub mod pipeline;
pub mod ports;

pub use domain::{
    ChatMessage, ChatRole, Difficulty, OutreachBrief, Priority, Question, RoutineConstraints,
    Subject, Test, TestDifficulty, TestResult, TestType,
};
pub use keystore::{ChatChannel, Namespace, SessionStore, StoreError, UserData};
pub use pipeline::{StageSpec, StageTool, TestParseError};
pub use ports::{PipelineExecutor, PortError, PortResult};
