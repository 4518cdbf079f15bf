pub mod board;
pub mod domain;
pub mod parsing;
pub mod ports;
pub mod scoring;
pub mod validation;

pub use board::{Applied, GenerationBoard};
pub use domain::{
    ContentKind, Flashcard, GenerationResult, GenerationStatus, InputType, NewNote, Note,
    NoteOutputs, NoteStatus, NoteUpdate, QuizQuestion,
};
pub use parsing::{parse_flashcards, parse_quiz};
pub use ports::{
    ContentGenerationService, DatabaseService, PortError, PortResult, TextExtractionService,
};
pub use scoring::{score_quiz, Grade, QuizScore};
pub use validation::ValidationError;
