//! Hand-sign and command label sets

use serde::{Deserialize, Serialize};

use crate::GestureError;

/// Fixed label sets shared by the classifier and the command sink.
///
/// Class `i` of the classifier maps to `hand_signs[i]`; when it wins a
/// session vote it is emitted as `commands[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignVocabulary {
    /// Classifier output labels
    pub hand_signs: Vec<String>,
    /// Command names, index-aligned with `hand_signs`
    pub commands: Vec<String>,
    /// Class that locks a face as the command target
    pub trigger_index: usize,
}

impl Default for SignVocabulary {
    fn default() -> Self {
        Self {
            hand_signs: ["0_front", "1_back", "1_front", "2_back", "2_front", "5_front", "ILU"]
                .into_iter()
                .map(String::from)
                .collect(),
            commands: [
                "ON/OFF",
                "TEMP_DOWN",
                "TEMP_UP",
                "SPEED_DOWN",
                "SPEED_UP",
                "COMMAND",
                "ROTATION",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            trigger_index: 5,
        }
    }
}

impl SignVocabulary {
    /// Check label sets are aligned and the trigger is a real class
    pub fn validate(&self) -> Result<(), GestureError> {
        if self.hand_signs.is_empty() {
            return Err(GestureError::Config("hand sign vocabulary is empty".into()));
        }
        if self.hand_signs.len() != self.commands.len() {
            return Err(GestureError::Config(format!(
                "{} hand signs but {} commands",
                self.hand_signs.len(),
                self.commands.len()
            )));
        }
        if self.trigger_index >= self.hand_signs.len() {
            return Err(GestureError::Config(format!(
                "trigger index {} out of range for {} classes",
                self.trigger_index,
                self.hand_signs.len()
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.hand_signs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hand_signs.is_empty()
    }

    pub fn is_trigger(&self, class_index: usize) -> bool {
        class_index == self.trigger_index
    }

    pub fn sign_label(&self, class_index: usize) -> Option<&str> {
        self.hand_signs.get(class_index).map(String::as_str)
    }

    pub fn command_label(&self, class_index: usize) -> Option<&str> {
        self.commands.get(class_index).map(String::as_str)
    }
}
