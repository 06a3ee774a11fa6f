use serde::Deserialize;

use crate::api::pagination::default_limit;

#[derive(Debug, Deserialize)]
pub(crate) struct ExamListQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
    #[serde(default, alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}
