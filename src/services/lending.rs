//! Lending lifecycle service
//!
//! Owns the borrow and return request state machines:
//!
//! - borrow requests: pending -> approved -> completed, or pending -> rejected
//! - return requests: pending -> approved or pending -> rejected
//!
//! Equipment rows mirror the request state (available / borrowed) and every
//! status move goes through a compare-and-set in the store, so two reviewers
//! deciding the same request, or two requests racing for the same equipment,
//! resolve to exactly one winner. The first decision wins; the loser gets an
//! error describing the state it lost to.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::enums::{BorrowStatus, EquipmentStatus, ReturnStatus},
    models::lending::{
        BorrowRequest, BorrowRequestDetails, Decision, NewBorrowRequest, NewReturnRequest,
        ReturnRequest, ReturnRequestDetails, StatusCorrection,
    },
    models::notification::NotificationKind,
    repository::lending::LendingStore,
};

/// Outbound notification delivery. Failures are logged and never abort
/// the lending operation that triggered them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: i32,
        equipment_id: Option<i32>,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<()>;
}

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn LendingStore>,
    notifier: Arc<dyn Notifier>,
}

impl LendingService {
    pub fn new(store: Arc<dyn LendingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Submit a borrow request for the equipment with the given inventory
    /// code. The equipment must currently be available; the request starts
    /// pending and the equipment is not touched until approval.
    pub async fn submit_borrow_request(
        &self,
        user_id: i32,
        equipment_code: &str,
        borrow_time: DateTime<Utc>,
        expected_return_time: DateTime<Utc>,
        note: Option<String>,
    ) -> AppResult<BorrowRequest> {
        let equipment = self.store.equipment_by_code(equipment_code).await?;
        if equipment.status != EquipmentStatus::Available {
            return Err(AppError::EquipmentUnavailable(format!(
                "Equipment {} is {}",
                equipment.code, equipment.status
            )));
        }

        let request = self
            .store
            .insert_borrow(&NewBorrowRequest {
                equipment_id: equipment.id,
                user_id,
                borrow_time,
                expected_return_time,
                note,
            })
            .await?;

        tracing::info!(
            request_id = request.id,
            equipment = %equipment.code,
            user_id,
            "borrow request submitted"
        );

        Ok(request)
    }

    /// Decide a pending borrow request.
    ///
    /// Approval claims the request row first and the equipment row second;
    /// if the equipment got taken in between, the claim is rolled back and
    /// the request stays pending. Rejection requires a non-blank reason and
    /// leaves the equipment untouched.
    pub async fn decide_borrow_request(
        &self,
        request_id: i32,
        decision: Decision,
        reason: Option<&str>,
    ) -> AppResult<BorrowRequest> {
        let request = self.store.borrow_by_id(request_id).await?;
        if request.status != BorrowStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Borrow request {} is {}, only pending requests can be decided",
                request_id, request.status
            )));
        }
        let equipment = self.store.equipment_by_id(request.equipment_id).await?;

        match decision {
            Decision::Approve => {
                let claimed = self
                    .store
                    .transition_borrow(
                        request_id,
                        BorrowStatus::Pending,
                        BorrowStatus::Approved,
                        None,
                    )
                    .await?;
                if !claimed {
                    return Err(AppError::InvalidTransition(format!(
                        "Borrow request {} was decided concurrently",
                        request_id
                    )));
                }

                let taken = self
                    .store
                    .transition_equipment(
                        request.equipment_id,
                        EquipmentStatus::Available,
                        EquipmentStatus::Borrowed,
                    )
                    .await?;
                if !taken {
                    // another approval won the equipment; undo the claim
                    let reverted = self
                        .store
                        .transition_borrow(
                            request_id,
                            BorrowStatus::Approved,
                            BorrowStatus::Pending,
                            None,
                        )
                        .await?;
                    if !reverted {
                        tracing::error!(
                            request_id,
                            "could not revert borrow claim after losing equipment"
                        );
                    }
                    return Err(AppError::EquipmentUnavailable(format!(
                        "Equipment {} is no longer available",
                        equipment.code
                    )));
                }

                tracing::info!(
                    request_id,
                    equipment = %equipment.code,
                    user_id = request.user_id,
                    "borrow request approved"
                );
                self.send(
                    request.user_id,
                    Some(equipment.id),
                    NotificationKind::BorrowApproved,
                    format!(
                        "Your borrow request for {} ({}) was approved.",
                        equipment.name, equipment.code
                    ),
                )
                .await;

                self.store.borrow_by_id(request_id).await
            }
            Decision::Reject => {
                let reason = required_reason(reason, "reject a borrow request")?;

                let rejected = self
                    .store
                    .transition_borrow(
                        request_id,
                        BorrowStatus::Pending,
                        BorrowStatus::Rejected,
                        Some(reason),
                    )
                    .await?;
                if !rejected {
                    return Err(AppError::InvalidTransition(format!(
                        "Borrow request {} was decided concurrently",
                        request_id
                    )));
                }

                tracing::info!(request_id, equipment = %equipment.code, "borrow request rejected");
                self.send(
                    request.user_id,
                    Some(equipment.id),
                    NotificationKind::BorrowRejected,
                    format!(
                        "Your borrow request for {} ({}) was rejected: {}",
                        equipment.name, equipment.code, reason
                    ),
                )
                .await;

                self.store.borrow_by_id(request_id).await
            }
        }
    }

    /// Submit a return request for one of the caller's approved borrows.
    pub async fn submit_return_request(
        &self,
        user_id: i32,
        borrow_request_id: i32,
        return_time: DateTime<Utc>,
    ) -> AppResult<ReturnRequest> {
        let borrow = self.store.borrow_by_id(borrow_request_id).await?;
        if borrow.user_id != user_id {
            return Err(AppError::NotOwner(format!(
                "Borrow request {} belongs to another user",
                borrow_request_id
            )));
        }
        if borrow.status != BorrowStatus::Approved {
            return Err(AppError::InvalidTransition(format!(
                "Borrow request {} is {}, only approved borrows can be returned",
                borrow_request_id, borrow.status
            )));
        }

        let request = self
            .store
            .insert_return(&NewReturnRequest {
                borrow_request_id,
                equipment_id: borrow.equipment_id,
                user_id,
                return_time,
            })
            .await?;

        tracing::info!(
            request_id = request.id,
            borrow_request_id,
            user_id,
            "return request submitted"
        );

        Ok(request)
    }

    /// Decide a pending return request.
    ///
    /// Approval completes the borrow, marks the return approved and frees
    /// the equipment. The borrow moves first: a stale return whose borrow
    /// was already completed through another return fails here instead of
    /// freeing equipment twice. Rejection requires a reason and leaves the
    /// borrow approved and the equipment borrowed.
    pub async fn decide_return_request(
        &self,
        request_id: i32,
        decision: Decision,
        reason: Option<&str>,
    ) -> AppResult<ReturnRequest> {
        let request = self.store.return_by_id(request_id).await?;
        if request.status != ReturnStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Return request {} is {}, only pending requests can be decided",
                request_id, request.status
            )));
        }
        let equipment = self.store.equipment_by_id(request.equipment_id).await?;

        match decision {
            Decision::Approve => {
                let completed = self
                    .store
                    .transition_borrow(
                        request.borrow_request_id,
                        BorrowStatus::Approved,
                        BorrowStatus::Completed,
                        None,
                    )
                    .await?;
                if !completed {
                    return Err(AppError::InvalidTransition(format!(
                        "Borrow request {} is not active anymore",
                        request.borrow_request_id
                    )));
                }

                let claimed = self
                    .store
                    .transition_return(
                        request_id,
                        ReturnStatus::Pending,
                        ReturnStatus::Approved,
                        None,
                    )
                    .await?;
                if !claimed {
                    // the same return was decided concurrently; undo the borrow
                    self.store
                        .transition_borrow(
                            request.borrow_request_id,
                            BorrowStatus::Completed,
                            BorrowStatus::Approved,
                            None,
                        )
                        .await?;
                    return Err(AppError::InvalidTransition(format!(
                        "Return request {} was decided concurrently",
                        request_id
                    )));
                }

                let freed = self
                    .store
                    .transition_equipment(
                        request.equipment_id,
                        EquipmentStatus::Borrowed,
                        EquipmentStatus::Available,
                    )
                    .await?;
                if !freed {
                    tracing::warn!(
                        equipment = %equipment.code,
                        "equipment was not borrowed while approving return, leaving it to reconciliation"
                    );
                }

                tracing::info!(
                    request_id,
                    borrow_request_id = request.borrow_request_id,
                    equipment = %equipment.code,
                    "return request approved"
                );
                self.send(
                    request.user_id,
                    Some(equipment.id),
                    NotificationKind::ReturnApproved,
                    format!(
                        "Return of {} ({}) was confirmed.",
                        equipment.name, equipment.code
                    ),
                )
                .await;

                self.store.return_by_id(request_id).await
            }
            Decision::Reject => {
                let reason = required_reason(reason, "reject a return request")?;

                let rejected = self
                    .store
                    .transition_return(
                        request_id,
                        ReturnStatus::Pending,
                        ReturnStatus::Rejected,
                        Some(reason),
                    )
                    .await?;
                if !rejected {
                    return Err(AppError::InvalidTransition(format!(
                        "Return request {} was decided concurrently",
                        request_id
                    )));
                }

                tracing::info!(
                    request_id,
                    borrow_request_id = request.borrow_request_id,
                    "return request rejected"
                );
                self.send(
                    request.user_id,
                    Some(equipment.id),
                    NotificationKind::ReturnRejected,
                    format!(
                        "Return request for {} ({}) was rejected: {}",
                        equipment.name, equipment.code, reason
                    ),
                )
                .await;

                self.store.return_by_id(request_id).await
            }
        }
    }

    /// Recompute every equipment status from the request tables and fix
    /// rows that drifted (say, after a crash between two writes).
    ///
    /// A row is corrected to borrowed when an approved borrow without an
    /// approved return exists, and to available when it is marked borrowed
    /// with no such borrow. Idle decommissioning equipment is left alone.
    /// Corrections use the same compare-and-set as regular transitions, so
    /// rows that move concurrently are skipped and picked up next run.
    pub async fn reconcile_equipment_status(&self) -> AppResult<Vec<StatusCorrection>> {
        let states = self.store.lending_states().await?;
        let mut corrections = Vec::new();

        for state in states {
            let target = match (state.status, state.has_active_borrow) {
                (EquipmentStatus::Borrowed, false) => EquipmentStatus::Available,
                (EquipmentStatus::Available, true) => EquipmentStatus::Borrowed,
                (EquipmentStatus::Decommissioning, true) => EquipmentStatus::Borrowed,
                _ => continue,
            };

            let applied = self
                .store
                .transition_equipment(state.equipment_id, state.status, target)
                .await?;
            if applied {
                tracing::warn!(
                    equipment = %state.code,
                    from = %state.status,
                    to = %target,
                    "corrected drifted equipment status"
                );
                corrections.push(StatusCorrection {
                    equipment_id: state.equipment_id,
                    equipment_code: state.code,
                    from: state.status,
                    to: target,
                });
            }
        }

        Ok(corrections)
    }

    /// Review queue of pending borrow requests, oldest first
    pub async fn pending_borrows(&self) -> AppResult<Vec<BorrowRequestDetails>> {
        self.store.pending_borrows().await
    }

    /// Review queue of pending return requests, oldest first
    pub async fn pending_returns(&self) -> AppResult<Vec<ReturnRequestDetails>> {
        self.store.pending_returns().await
    }

    /// Borrow history of one user, newest first
    pub async fn user_borrows(
        &self,
        user_id: i32,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        self.store.user_borrows(user_id, page, per_page).await
    }

    async fn send(
        &self,
        user_id: i32,
        equipment_id: Option<i32>,
        kind: NotificationKind,
        message: String,
    ) {
        if let Err(err) = self
            .notifier
            .notify(user_id, equipment_id, kind, &message)
            .await
        {
            tracing::warn!(user_id, kind = %kind, error = %err, "failed to deliver notification");
        }
    }
}

fn required_reason<'a>(reason: Option<&'a str>, action: &str) -> AppResult<&'a str> {
    match reason {
        Some(r) if !r.trim().is_empty() => Ok(r),
        _ => Err(AppError::MissingReason(format!(
            "A reason is required to {}",
            action
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::Equipment;
    use crate::models::lending::EquipmentLendingState;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemStore {
        inner: Mutex<MemInner>,
    }

    #[derive(Default)]
    struct MemInner {
        equipment: Vec<Equipment>,
        borrows: Vec<BorrowRequest>,
        returns: Vec<ReturnRequest>,
        next_id: i32,
    }

    impl MemInner {
        fn next_id(&mut self) -> i32 {
            self.next_id += 1;
            self.next_id
        }

        fn borrow_details(&self, b: &BorrowRequest) -> BorrowRequestDetails {
            let equipment = self
                .equipment
                .iter()
                .find(|e| e.id == b.equipment_id)
                .unwrap();
            BorrowRequestDetails {
                id: b.id,
                equipment_id: b.equipment_id,
                equipment_code: equipment.code.clone(),
                equipment_name: equipment.name.clone(),
                user_id: b.user_id,
                username: format!("user{}", b.user_id),
                borrow_time: b.borrow_time,
                expected_return_time: b.expected_return_time,
                note: b.note.clone(),
                status: b.status,
                decision_reason: b.decision_reason.clone(),
                decided_at: b.decided_at,
                created_at: b.created_at,
            }
        }

        fn return_details(&self, r: &ReturnRequest) -> ReturnRequestDetails {
            let equipment = self
                .equipment
                .iter()
                .find(|e| e.id == r.equipment_id)
                .unwrap();
            ReturnRequestDetails {
                id: r.id,
                borrow_request_id: r.borrow_request_id,
                equipment_id: r.equipment_id,
                equipment_code: equipment.code.clone(),
                equipment_name: equipment.name.clone(),
                user_id: r.user_id,
                username: format!("user{}", r.user_id),
                return_time: r.return_time,
                status: r.status,
                decision_reason: r.decision_reason.clone(),
                decided_at: r.decided_at,
                created_at: r.created_at,
            }
        }
    }

    impl MemStore {
        fn add_equipment(&self, code: &str, status: EquipmentStatus) -> i32 {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id();
            inner.equipment.push(Equipment {
                id,
                code: code.to_string(),
                name: format!("Oscilloscope {}", code),
                model: None,
                department: None,
                price: None,
                purchase_date: None,
                status,
                created_at: Utc::now(),
                updated_at: None,
            });
            id
        }

        /// Inject a borrow directly, bypassing the service (drift setups)
        fn add_borrow(&self, equipment_id: i32, user_id: i32, status: BorrowStatus) -> i32 {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id();
            let now = Utc::now();
            inner.borrows.push(BorrowRequest {
                id,
                equipment_id,
                user_id,
                borrow_time: now,
                expected_return_time: now + Duration::days(3),
                note: None,
                status,
                decision_reason: None,
                decided_at: match status {
                    BorrowStatus::Pending => None,
                    _ => Some(now),
                },
                created_at: now,
            });
            id
        }

        fn equipment_status(&self, id: i32) -> EquipmentStatus {
            let inner = self.inner.lock().unwrap();
            inner
                .equipment
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.status)
                .unwrap()
        }

        fn borrow_status(&self, id: i32) -> BorrowStatus {
            let inner = self.inner.lock().unwrap();
            inner
                .borrows
                .iter()
                .find(|b| b.id == id)
                .map(|b| b.status)
                .unwrap()
        }

        fn return_status(&self, id: i32) -> ReturnStatus {
            let inner = self.inner.lock().unwrap();
            inner
                .returns
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.status)
                .unwrap()
        }
    }

    #[async_trait]
    impl LendingStore for MemStore {
        async fn equipment_by_id(&self, id: i32) -> AppResult<Equipment> {
            let inner = self.inner.lock().unwrap();
            inner
                .equipment
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
        }

        async fn equipment_by_code(&self, code: &str) -> AppResult<Equipment> {
            let inner = self.inner.lock().unwrap();
            inner
                .equipment
                .iter()
                .find(|e| e.code == code)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", code)))
        }

        async fn transition_equipment(
            &self,
            id: i32,
            from: EquipmentStatus,
            to: EquipmentStatus,
        ) -> AppResult<bool> {
            let mut inner = self.inner.lock().unwrap();
            match inner.equipment.iter_mut().find(|e| e.id == id) {
                Some(e) if e.status == from => {
                    e.status = to;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn insert_borrow(&self, new: &NewBorrowRequest) -> AppResult<BorrowRequest> {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id();
            let request = BorrowRequest {
                id,
                equipment_id: new.equipment_id,
                user_id: new.user_id,
                borrow_time: new.borrow_time,
                expected_return_time: new.expected_return_time,
                note: new.note.clone(),
                status: BorrowStatus::Pending,
                decision_reason: None,
                decided_at: None,
                created_at: Utc::now(),
            };
            inner.borrows.push(request.clone());
            Ok(request)
        }

        async fn borrow_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
            let inner = self.inner.lock().unwrap();
            inner
                .borrows
                .iter()
                .find(|b| b.id == id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Borrow request {} not found", id)))
        }

        async fn transition_borrow(
            &self,
            id: i32,
            from: BorrowStatus,
            to: BorrowStatus,
            reason: Option<&str>,
        ) -> AppResult<bool> {
            let mut inner = self.inner.lock().unwrap();
            match inner.borrows.iter_mut().find(|b| b.id == id) {
                Some(b) if b.status == from => {
                    b.status = to;
                    if let Some(reason) = reason {
                        b.decision_reason = Some(reason.to_string());
                    }
                    if to == BorrowStatus::Pending {
                        b.decided_at = None;
                    } else if from == BorrowStatus::Pending {
                        b.decided_at = Some(Utc::now());
                    }
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn insert_return(&self, new: &NewReturnRequest) -> AppResult<ReturnRequest> {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id();
            let request = ReturnRequest {
                id,
                borrow_request_id: new.borrow_request_id,
                equipment_id: new.equipment_id,
                user_id: new.user_id,
                return_time: new.return_time,
                status: ReturnStatus::Pending,
                decision_reason: None,
                decided_at: None,
                created_at: Utc::now(),
            };
            inner.returns.push(request.clone());
            Ok(request)
        }

        async fn return_by_id(&self, id: i32) -> AppResult<ReturnRequest> {
            let inner = self.inner.lock().unwrap();
            inner
                .returns
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Return request {} not found", id)))
        }

        async fn transition_return(
            &self,
            id: i32,
            from: ReturnStatus,
            to: ReturnStatus,
            reason: Option<&str>,
        ) -> AppResult<bool> {
            let mut inner = self.inner.lock().unwrap();
            match inner.returns.iter_mut().find(|r| r.id == id) {
                Some(r) if r.status == from => {
                    r.status = to;
                    if let Some(reason) = reason {
                        r.decision_reason = Some(reason.to_string());
                    }
                    r.decided_at = Some(Utc::now());
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn pending_borrows(&self) -> AppResult<Vec<BorrowRequestDetails>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .borrows
                .iter()
                .filter(|b| b.status == BorrowStatus::Pending)
                .map(|b| inner.borrow_details(b))
                .collect())
        }

        async fn pending_returns(&self) -> AppResult<Vec<ReturnRequestDetails>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .returns
                .iter()
                .filter(|r| r.status == ReturnStatus::Pending)
                .map(|r| inner.return_details(r))
                .collect())
        }

        async fn user_borrows(
            &self,
            user_id: i32,
            page: i64,
            per_page: i64,
        ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
            let inner = self.inner.lock().unwrap();
            let mut all: Vec<_> = inner
                .borrows
                .iter()
                .filter(|b| b.user_id == user_id)
                .collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = all.len() as i64;
            let rows = all
                .into_iter()
                .skip(((page - 1) * per_page) as usize)
                .take(per_page as usize)
                .map(|b| inner.borrow_details(b))
                .collect();
            Ok((rows, total))
        }

        async fn lending_states(&self) -> AppResult<Vec<EquipmentLendingState>> {
            let inner = self.inner.lock().unwrap();
            let states = inner
                .equipment
                .iter()
                .map(|e| {
                    let has_active_borrow = inner.borrows.iter().any(|b| {
                        b.equipment_id == e.id
                            && b.status == BorrowStatus::Approved
                            && !inner.returns.iter().any(|r| {
                                r.borrow_request_id == b.id && r.status == ReturnStatus::Approved
                            })
                    });
                    EquipmentLendingState {
                        equipment_id: e.id,
                        code: e.code.clone(),
                        status: e.status,
                        has_active_borrow,
                    }
                })
                .collect();
            Ok(states)
        }
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc::now();
        (start, start + Duration::days(3))
    }

    fn accepting_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(|_, _, _, _| Ok(()));
        notifier
    }

    fn service(store: Arc<MemStore>, notifier: MockNotifier) -> LendingService {
        LendingService::new(store, Arc::new(notifier))
    }

    #[tokio::test]
    async fn full_cycle_borrow_and_return() {
        let store = Arc::new(MemStore::default());
        let eq = store.add_equipment("EQ001", EquipmentStatus::Available);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|_, _, kind, _| *kind == NotificationKind::BorrowApproved)
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        notifier
            .expect_notify()
            .withf(|_, _, kind, _| *kind == NotificationKind::ReturnApproved)
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let svc = service(store.clone(), notifier);
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(10, "EQ001", start, end, Some("experiment".into()))
            .await
            .unwrap();
        assert_eq!(borrow.status, BorrowStatus::Pending);
        // submission alone must not touch the equipment
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Available);

        let approved = svc
            .decide_borrow_request(borrow.id, Decision::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.status, BorrowStatus::Approved);
        assert!(approved.decided_at.is_some());
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Borrowed);

        let ret = svc
            .submit_return_request(10, borrow.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(ret.status, ReturnStatus::Pending);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Borrowed);

        let done = svc
            .decide_return_request(ret.id, Decision::Approve, None)
            .await
            .unwrap();
        assert_eq!(done.status, ReturnStatus::Approved);
        assert_eq!(store.borrow_status(borrow.id), BorrowStatus::Completed);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn submit_requires_available_equipment() {
        let store = Arc::new(MemStore::default());
        store.add_equipment("EQ001", EquipmentStatus::Borrowed);
        store.add_equipment("EQ002", EquipmentStatus::Decommissioning);

        let svc = service(store.clone(), MockNotifier::new());
        let (start, end) = window();

        let err = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EquipmentUnavailable(_)));

        let err = svc
            .submit_borrow_request(1, "EQ002", start, end, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EquipmentUnavailable(_)));

        let err = svc
            .submit_borrow_request(1, "EQ999", start, end, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_approval_for_same_equipment_loses() {
        let store = Arc::new(MemStore::default());
        let eq = store.add_equipment("EQ001", EquipmentStatus::Available);

        let svc = service(store.clone(), accepting_notifier());
        let (start, end) = window();

        let first = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();
        let second = svc
            .submit_borrow_request(2, "EQ001", start, end, None)
            .await
            .unwrap();

        svc.decide_borrow_request(first.id, Decision::Approve, None)
            .await
            .unwrap();

        let err = svc
            .decide_borrow_request(second.id, Decision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EquipmentUnavailable(_)));

        // the loser stays pending and the winner keeps the equipment
        assert_eq!(store.borrow_status(second.id), BorrowStatus::Pending);
        assert_eq!(store.borrow_status(first.id), BorrowStatus::Approved);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Borrowed);
    }

    #[tokio::test]
    async fn deciding_twice_fails() {
        let store = Arc::new(MemStore::default());
        store.add_equipment("EQ001", EquipmentStatus::Available);

        let svc = service(store.clone(), accepting_notifier());
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();
        svc.decide_borrow_request(borrow.id, Decision::Approve, None)
            .await
            .unwrap();

        let err = svc
            .decide_borrow_request(borrow.id, Decision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        let err = svc
            .decide_borrow_request(borrow.id, Decision::Reject, Some("too late"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn rejection_requires_reason() {
        let store = Arc::new(MemStore::default());
        let eq = store.add_equipment("EQ001", EquipmentStatus::Available);

        // no expectations: rejecting without a reason must not notify
        let svc = service(store.clone(), MockNotifier::new());
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();

        for reason in [None, Some(""), Some("   ")] {
            let err = svc
                .decide_borrow_request(borrow.id, Decision::Reject, reason)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::MissingReason(_)));
        }

        assert_eq!(store.borrow_status(borrow.id), BorrowStatus::Pending);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn rejection_notifies_with_reason() {
        let store = Arc::new(MemStore::default());
        let eq = store.add_equipment("EQ001", EquipmentStatus::Available);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|user_id, _, kind, message| {
                *user_id == 1
                    && *kind == NotificationKind::BorrowRejected
                    && message.contains("equipment is damaged")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let svc = service(store.clone(), notifier);
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();
        let rejected = svc
            .decide_borrow_request(borrow.id, Decision::Reject, Some("equipment is damaged"))
            .await
            .unwrap();

        assert_eq!(rejected.status, BorrowStatus::Rejected);
        assert_eq!(
            rejected.decision_reason.as_deref(),
            Some("equipment is damaged")
        );
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn return_submission_guards() {
        let store = Arc::new(MemStore::default());
        store.add_equipment("EQ001", EquipmentStatus::Available);

        let svc = service(store.clone(), accepting_notifier());
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();

        // ownership is checked before the borrow state
        let err = svc
            .submit_return_request(2, borrow.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotOwner(_)));

        let err = svc
            .submit_return_request(1, borrow.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        svc.decide_borrow_request(borrow.id, Decision::Reject, Some("no"))
            .await
            .unwrap();
        let err = svc
            .submit_return_request(1, borrow.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        let err = svc
            .submit_return_request(1, 999, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejected_return_keeps_loan_active() {
        let store = Arc::new(MemStore::default());
        let eq = store.add_equipment("EQ001", EquipmentStatus::Available);

        let svc = service(store.clone(), accepting_notifier());
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();
        svc.decide_borrow_request(borrow.id, Decision::Approve, None)
            .await
            .unwrap();

        let ret = svc
            .submit_return_request(1, borrow.id, Utc::now())
            .await
            .unwrap();

        let err = svc
            .decide_return_request(ret.id, Decision::Reject, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingReason(_)));

        let rejected = svc
            .decide_return_request(ret.id, Decision::Reject, Some("equipment came back dirty"))
            .await
            .unwrap();
        assert_eq!(rejected.status, ReturnStatus::Rejected);

        // the loan is still active, the borrower retries and succeeds
        assert_eq!(store.borrow_status(borrow.id), BorrowStatus::Approved);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Borrowed);

        let retry = svc
            .submit_return_request(1, borrow.id, Utc::now())
            .await
            .unwrap();
        svc.decide_return_request(retry.id, Decision::Approve, None)
            .await
            .unwrap();
        assert_eq!(store.borrow_status(borrow.id), BorrowStatus::Completed);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn stale_return_fails_after_completion() {
        let store = Arc::new(MemStore::default());
        let eq = store.add_equipment("EQ001", EquipmentStatus::Available);

        let svc = service(store.clone(), accepting_notifier());
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();
        svc.decide_borrow_request(borrow.id, Decision::Approve, None)
            .await
            .unwrap();

        let first = svc
            .submit_return_request(1, borrow.id, Utc::now())
            .await
            .unwrap();
        let second = svc
            .submit_return_request(1, borrow.id, Utc::now())
            .await
            .unwrap();

        svc.decide_return_request(first.id, Decision::Approve, None)
            .await
            .unwrap();

        let err = svc
            .decide_return_request(second.id, Decision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        // the stale return is still pending and the equipment was freed once
        assert_eq!(store.return_status(second.id), ReturnStatus::Pending);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn reconciliation_fixes_drift() {
        let store = Arc::new(MemStore::default());
        // active borrow but the equipment row says available
        let drifted_busy = store.add_equipment("EQ001", EquipmentStatus::Available);
        store.add_borrow(drifted_busy, 1, BorrowStatus::Approved);
        // no active borrow but the equipment row says borrowed
        let drifted_free = store.add_equipment("EQ002", EquipmentStatus::Borrowed);
        store.add_borrow(drifted_free, 2, BorrowStatus::Completed);
        // consistent rows must not move
        let busy = store.add_equipment("EQ003", EquipmentStatus::Borrowed);
        store.add_borrow(busy, 3, BorrowStatus::Approved);
        let idle_decom = store.add_equipment("EQ004", EquipmentStatus::Decommissioning);

        let svc = service(store.clone(), MockNotifier::new());

        let corrections = svc.reconcile_equipment_status().await.unwrap();
        assert_eq!(corrections.len(), 2);
        assert_eq!(store.equipment_status(drifted_busy), EquipmentStatus::Borrowed);
        assert_eq!(store.equipment_status(drifted_free), EquipmentStatus::Available);
        assert_eq!(store.equipment_status(busy), EquipmentStatus::Borrowed);
        assert_eq!(
            store.equipment_status(idle_decom),
            EquipmentStatus::Decommissioning
        );

        // a second run finds nothing to do
        let corrections = svc.reconcile_equipment_status().await.unwrap();
        assert!(corrections.is_empty());
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_decisions() {
        let store = Arc::new(MemStore::default());
        let eq = store.add_equipment("EQ001", EquipmentStatus::Available);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .returning(|_, _, _, _| Err(AppError::Internal("smtp down".into())));

        let svc = service(store.clone(), notifier);
        let (start, end) = window();

        let borrow = svc
            .submit_borrow_request(1, "EQ001", start, end, None)
            .await
            .unwrap();
        let approved = svc
            .decide_borrow_request(borrow.id, Decision::Approve, None)
            .await
            .unwrap();

        assert_eq!(approved.status, BorrowStatus::Approved);
        assert_eq!(store.equipment_status(eq), EquipmentStatus::Borrowed);
    }
}
