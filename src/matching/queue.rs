use crate::error::AppError;
use crate::models::announcement::Announcement;
use crate::state::AppState;

pub async fn enqueue_announcement(
    state: &AppState,
    announcement: Announcement,
) -> Result<(), AppError> {
    state
        .announcement_tx
        .send(announcement)
        .await
        .map_err(|err| AppError::Internal(format!("matching queue send failed: {err}")))?;

    state.metrics.announcements_in_queue.inc();
    Ok(())
}
