//! Student registration and test grading, persisted through a [`StudentStore`].
//!
//! The on-disk format is JSON with camelCase keys so files written by older
//! builds of the lab software keep loading.

use serde::{Deserialize, Serialize};

use fotsim_traits::StudentStore;

/// Outcome of one knowledge test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScore {
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Five-point academic grade, 2 (fail) to 5.
    pub grade: u8,
}

impl TestScore {
    /// Grade a raw score on the five-point scale: 90% for a 5, 75% for a 4,
    /// 60% for a 3, anything below fails with a 2.
    pub fn graded(total_questions: u32, correct_answers: u32) -> Self {
        let fraction = if total_questions == 0 {
            0.0
        } else {
            f64::from(correct_answers) / f64::from(total_questions)
        };
        let grade = if fraction >= 0.9 {
            5
        } else if fraction >= 0.75 {
            4
        } else if fraction >= 0.6 {
            3
        } else {
            2
        };
        Self {
            total_questions,
            correct_answers,
            grade,
        }
    }

    pub fn passed(&self) -> bool {
        self.grade >= 3
    }
}

/// One student's progress through the lab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub group: String,
    #[serde(
        rename = "admissionTestResult",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub admission_test: Option<TestScore>,
    #[serde(
        rename = "finalTestResult",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub final_test: Option<TestScore>,
}

impl StudentRecord {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            admission_test: None,
            final_test: None,
        }
    }
}

pub fn save_record(store: &mut dyn StudentStore, record: &StudentRecord) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    store.save(&json).map_err(|e| eyre::eyre!(e))?;
    Ok(())
}

pub fn load_record(store: &mut dyn StudentStore) -> eyre::Result<Option<StudentRecord>> {
    match store.load().map_err(|e| eyre::eyre!(e))? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
