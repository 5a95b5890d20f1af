use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Posted,
    InProgress,
    Completed,
    Cancelled,
    Disputed,
}

/// Only the fields that drive money movement live here; descriptive job
/// data belongs to the CRUD layer around the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub client_id: Uuid,
    pub assigned_freelancer_id: Option<Uuid>,
    pub budget: Amount,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(client_id: Uuid, budget: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            assigned_freelancer_id: None,
            budget,
            status: JobStatus::Posted,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// True for the job's client or its assigned freelancer.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.assigned_freelancer_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub job_id: Uuid,
    pub title: String,
    pub amount: Amount,
    pub status: MilestoneStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn new(job_id: Uuid, title: impl Into<String>, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            title: title.into(),
            amount,
            status: MilestoneStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub freelancer_id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn new(job_id: Uuid, freelancer_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            freelancer_id,
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
        }
    }
}

/// One review per job per reviewer; the reviewee's average rating is
/// recomputed over the full review set on every submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub job_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        job_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: u8,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            reviewer_id,
            reviewee_id,
            rating,
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }
}
