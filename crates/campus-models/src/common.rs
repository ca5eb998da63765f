//! Small shapes shared by several modules.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::ids::AcademicYearId;
use campus_core::serde::deserialize_optional_from_str;

/// One bucket of a `GROUP BY` count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `?academic_year_id=` on reports that can be scoped to a year.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct YearScope {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
}
