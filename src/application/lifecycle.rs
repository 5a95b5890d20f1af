use crate::application::escrow::EscrowManager;
use crate::application::ledger::{Ledger, Posting};
use crate::domain::escrow::EscrowState;
use crate::domain::job::{
    ApplicationStatus, Job, JobApplication, JobStatus, Milestone, MilestoneStatus, Review,
};
use crate::domain::ledger::{EntryKind, WalletKind};
use crate::domain::money::Amount;
use crate::domain::ports::{
    ApplicationStoreRef, JobStoreRef, MilestoneStoreRef, Notification, NotificationAudience,
    NotificationKind, NotifierRef, ReviewStoreRef,
};
use crate::error::{EngineError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Drives job and milestone transitions and invokes the escrow manager and
/// ledger at the right points. Authorization is checked before any state
/// mutation, so a rejected caller leaves no side effects.
pub struct LifecycleCoordinator {
    jobs: JobStoreRef,
    milestones: MilestoneStoreRef,
    applications: ApplicationStoreRef,
    reviews: ReviewStoreRef,
    escrow: Arc<EscrowManager>,
    ledger: Arc<Ledger>,
    notifier: NotifierRef,
}

impl LifecycleCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: JobStoreRef,
        milestones: MilestoneStoreRef,
        applications: ApplicationStoreRef,
        reviews: ReviewStoreRef,
        escrow: Arc<EscrowManager>,
        ledger: Arc<Ledger>,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            jobs,
            milestones,
            applications,
            reviews,
            escrow,
            ledger,
            notifier,
        }
    }

    pub async fn post_job(&self, client_id: Uuid, budget: Amount) -> Result<Job> {
        let job = Job::new(client_id, budget);
        self.jobs.store(job.clone()).await?;
        Ok(job)
    }

    pub async fn apply(&self, job_id: Uuid, freelancer_id: Uuid) -> Result<JobApplication> {
        let job = self.job(job_id).await?;
        let application = JobApplication::new(job.id, freelancer_id);
        self.applications.store(application.clone()).await?;
        self.notify(Notification {
            audience: NotificationAudience::Users(vec![job.client_id]),
            title: "New Job Application".into(),
            message: "New application received for your job".into(),
            kind: NotificationKind::JobApplication,
        })
        .await;
        Ok(application)
    }

    /// Only the job's client may accept, and a job is assigned at most
    /// once.
    pub async fn accept_application(&self, application_id: Uuid, actor: Uuid) -> Result<Job> {
        let mut application = self
            .applications
            .get(application_id)
            .await?
            .ok_or(EngineError::ApplicationNotFound(application_id))?;
        let mut job = self.job(application.job_id).await?;

        if job.client_id != actor {
            return Err(EngineError::Unauthorized);
        }
        if job.assigned_freelancer_id.is_some() {
            return Err(EngineError::AlreadyAssigned(job.id));
        }

        application.status = ApplicationStatus::Accepted;
        job.assigned_freelancer_id = Some(application.freelancer_id);
        job.status = JobStatus::InProgress;
        self.applications.store(application.clone()).await?;
        self.jobs.store(job.clone()).await?;

        self.notify(Notification {
            audience: NotificationAudience::Users(vec![application.freelancer_id]),
            title: "Job Application Accepted".into(),
            message: "Your application has been accepted".into(),
            kind: NotificationKind::JobAccepted,
        })
        .await;
        Ok(job)
    }

    /// Creates a milestone and opens its escrow hold. Client only; the job
    /// must already have an assigned freelancer for the hold to name a
    /// payee.
    pub async fn create_milestone(
        &self,
        job_id: Uuid,
        actor: Uuid,
        title: &str,
        amount: Amount,
    ) -> Result<Milestone> {
        let job = self.job(job_id).await?;
        if job.client_id != actor {
            return Err(EngineError::Unauthorized);
        }
        let freelancer_id = job
            .assigned_freelancer_id
            .ok_or(EngineError::JobNotAssigned(job.id))?;

        let milestone = Milestone::new(job.id, title, amount);
        self.milestones.store(milestone.clone()).await?;
        self.escrow
            .hold(
                job.id,
                Some(milestone.id),
                job.client_id,
                freelancer_id,
                amount,
                format!("Milestone: {title}"),
            )
            .await?;
        Ok(milestone)
    }

    /// Marks the milestone completed and releases its held escrow, which
    /// credits the freelancer exactly once.
    pub async fn complete_milestone(&self, milestone_id: Uuid, actor: Uuid) -> Result<Milestone> {
        let mut milestone = self
            .milestones
            .get(milestone_id)
            .await?
            .ok_or(EngineError::MilestoneNotFound(milestone_id))?;
        let job = self.job(milestone.job_id).await?;
        if !job.is_participant(actor) {
            return Err(EngineError::Unauthorized);
        }

        if milestone.status != MilestoneStatus::Completed {
            milestone.status = MilestoneStatus::Completed;
            milestone.completed_at = Some(Utc::now());
            self.milestones.store(milestone.clone()).await?;
        }

        if let Some(hold) = self.escrow.holds().for_milestone(milestone.id).await?
            && hold.state == EscrowState::Held
        {
            self.escrow.release(hold.id).await?;
        }

        self.notify(Notification {
            audience: NotificationAudience::Users(self.job_parties(&job)),
            title: "Milestone Completed".into(),
            message: format!("Milestone \"{}\" completed and payment released", milestone.title),
            kind: NotificationKind::MilestoneCompleted,
        })
        .await;
        Ok(milestone)
    }

    /// Completes the job; an optional caller-supplied final amount is
    /// credited to the freelancer as a job payment. The amount is trusted
    /// (no budget clamp), but keyed by the job id so repeating the call
    /// cannot pay twice.
    pub async fn complete_job(
        &self,
        job_id: Uuid,
        actor: Uuid,
        final_amount: Option<Amount>,
    ) -> Result<Job> {
        let mut job = self.job(job_id).await?;
        if !job.is_participant(actor) {
            return Err(EngineError::Unauthorized);
        }

        // Resolve the payee before any write so a validation failure
        // leaves the job untouched.
        let payout = match final_amount {
            Some(amount) => Some((
                job.assigned_freelancer_id
                    .ok_or(EngineError::JobNotAssigned(job.id))?,
                amount,
            )),
            None => None,
        };

        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        self.jobs.store(job.clone()).await?;

        if let Some((freelancer_id, amount)) = payout {
            self.ledger
                .credit(
                    Posting::new(freelancer_id, WalletKind::Earnings, amount, EntryKind::JobPayment)
                        .job(job.id)
                        .describe("Payment for job completion")
                        .reference(job.id.to_string()),
                )
                .await?;
        }

        self.notify(Notification {
            audience: NotificationAudience::Users(self.job_parties(&job)),
            title: "Job Completed".into(),
            message: "Job has been marked as completed".into(),
            kind: NotificationKind::JobCompleted,
        })
        .await;
        Ok(job)
    }

    /// Moves the job to `disputed` and freezes its held escrow so nothing
    /// releases until a human resolves the dispute.
    pub async fn raise_dispute(&self, job_id: Uuid, actor: Uuid) -> Result<Job> {
        let mut job = self.job(job_id).await?;
        if !job.is_participant(actor) {
            return Err(EngineError::Unauthorized);
        }

        job.status = JobStatus::Disputed;
        self.jobs.store(job.clone()).await?;

        for hold in self.escrow.holds().for_job(job.id).await? {
            if hold.state == EscrowState::Held {
                self.escrow.mark_disputed(hold.id).await?;
            }
        }

        self.notify(Notification {
            audience: NotificationAudience::Broadcast,
            title: "New Dispute Filed".into(),
            message: "A dispute has been filed and needs review".into(),
            kind: NotificationKind::Dispute,
        })
        .await;
        Ok(job)
    }

    /// Records a review and recomputes the reviewee's average rating over
    /// the full review set; no incremental running average, so the stored
    /// aggregate cannot drift.
    pub async fn submit_review(
        &self,
        job_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: u8,
        comment: &str,
    ) -> Result<Review> {
        if !(1..=5).contains(&rating) {
            return Err(EngineError::InvalidRating(rating));
        }
        let job = self.job(job_id).await?;
        let valid_pairing = (job.client_id == reviewer_id
            && job.assigned_freelancer_id == Some(reviewee_id))
            || (job.assigned_freelancer_id == Some(reviewer_id) && job.client_id == reviewee_id);
        if !valid_pairing {
            return Err(EngineError::Unauthorized);
        }
        if self.reviews.exists(job.id, reviewer_id).await? {
            return Err(EngineError::DuplicateReview);
        }

        let review = Review::new(job.id, reviewer_id, reviewee_id, rating, comment);
        self.reviews.append(review.clone()).await?;

        let all = self.reviews.for_reviewee(reviewee_id).await?;
        let count = all.len() as u32;
        let sum: u32 = all.iter().map(|r| u32::from(r.rating)).sum();
        let average = if count == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(sum) / Decimal::from(count)).round_dp(2)
        };

        self.ledger
            .update_account(reviewee_id, |reviewee| {
                reviewee.rating = average;
                reviewee.total_reviews = count;
            })
            .await?;

        self.notify(Notification {
            audience: NotificationAudience::Users(vec![reviewee_id]),
            title: "New Review Received".into(),
            message: format!("You received a {rating}-star review"),
            kind: NotificationKind::ReviewReceived,
        })
        .await;
        Ok(review)
    }

    async fn job(&self, job_id: Uuid) -> Result<Job> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or(EngineError::JobNotFound(job_id))
    }

    fn job_parties(&self, job: &Job) -> Vec<Uuid> {
        let mut parties = vec![job.client_id];
        parties.extend(job.assigned_freelancer_id);
        parties
    }

    async fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(&notification).await {
            warn!(%err, "notification delivery failed");
        }
    }
}
