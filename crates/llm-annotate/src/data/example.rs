use serde::{Deserialize, Serialize};

/// A predicted item paired with its gold reference, used for scoring.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Example<I> {
    pub predicted: I,
    pub reference: I,
}

impl<I> Example<I> {
    pub fn new(predicted: I, reference: I) -> Self {
        Self {
            predicted,
            reference,
        }
    }
}
