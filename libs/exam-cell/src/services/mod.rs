pub mod exam;

pub use exam::ExamService;
