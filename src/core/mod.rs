pub mod etl;
pub mod inventory;
pub mod normalizer;

pub use crate::domain::model::{AreaKey, Business, MergeOutcome, SlugSet};
pub use crate::domain::ports::{Pipeline, ServiceAreaStore, Storage};
pub use crate::utils::error::Result;
