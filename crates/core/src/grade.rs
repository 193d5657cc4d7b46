//! Activity grade model and grade statistics.

use serde::{Deserialize, Serialize};

use crate::id::{GradeId, InteractionId, ProgramUserId};
use crate::Time;

/// Grades at or above this value count as passing in statistics.
pub const PASSING_GRADE: f64 = 60.0;

/// A grade recorded against one content interaction.
///
/// At most one grade exists per interaction; regrading overwrites the
/// existing row and refreshes `graded_at` (upsert semantics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityGrade {
    /// Unique identifier
    pub id: GradeId,

    /// The interaction this grade is for (1:1)
    pub interaction_id: InteractionId,

    /// Numeric grade value
    pub grade: f64,

    /// Free-form feedback for the learner
    pub feedback: Option<String>,

    /// Opaque grading detail payload (rubric scores, auto-scoring trace, ...)
    pub grading_details: Option<serde_json::Value>,

    /// The program member who graded
    pub grader_program_user_id: ProgramUserId,

    /// When the grade was (last) recorded
    pub graded_at: Time,
}

impl ActivityGrade {
    /// Whether this grade meets the passing threshold.
    pub fn is_passing(&self) -> bool {
        self.grade >= PASSING_GRADE
    }
}

/// Aggregate grade statistics for a program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeStatistics {
    /// Number of grades
    pub count: usize,

    /// Mean grade value
    pub average: f64,

    /// Lowest grade value
    pub min: f64,

    /// Highest grade value
    pub max: f64,

    /// Percentage of grades at or above [`PASSING_GRADE`]
    pub passing_rate: f64,
}

impl GradeStatistics {
    /// Compute statistics over a set of grade values.
    ///
    /// An empty set yields all zeros rather than dividing by zero.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let passing = values.iter().filter(|v| **v >= PASSING_GRADE).count();

        Self {
            count,
            average: sum / count as f64,
            min,
            max,
            passing_rate: passing as f64 / count as f64 * 100.0,
        }
    }
}
