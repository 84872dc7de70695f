#[cfg(test)]
mod model_tests {
    use crate::{
        error::WaypointError,
        models::{
            PlanFilter, PlanStatus, Priority, Progress, UpdatePhaseRequest, UpdateTaskRequest,
            WorkStatus,
        },
        params::{ListPlans, UpdatePhase, UpdateTask},
    };

    #[test]
    fn test_work_status_parsing() {
        assert_eq!("pending".parse::<WorkStatus>().unwrap(), WorkStatus::Pending);
        assert_eq!("IN_PROGRESS".parse::<WorkStatus>().unwrap(), WorkStatus::InProgress);
        assert_eq!("inprogress".parse::<WorkStatus>().unwrap(), WorkStatus::InProgress);
        assert_eq!("Completed".parse::<WorkStatus>().unwrap(), WorkStatus::Completed);

        match "done".parse::<WorkStatus>() {
            Err(WaypointError::InvalidStatus { value }) => assert_eq!(value, "done"),
            other => panic!("expected invalid status, got {other:?}"),
        }
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&WorkStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::from_str::<PlanStatus>("\"planning\"").unwrap(),
            PlanStatus::Planning
        );
        assert!(serde_json::from_str::<PlanStatus>("\"archived\"").is_err());
    }

    #[test]
    fn test_can_start() {
        assert!(WorkStatus::Pending.can_start());
        assert!(WorkStatus::Failed.can_start());
        assert!(!WorkStatus::InProgress.can_start());
        assert!(!WorkStatus::Completed.can_start());
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(Progress::new(0, 0).percentage, 0);
        assert_eq!(Progress::new(1, 2).percentage, 50);
        assert_eq!(Progress::new(1, 8).percentage, 13);
        assert_eq!(Progress::new(3, 3).percentage, 100);
    }

    #[test]
    fn test_plan_filter_rejects_unknown_status() {
        let params = ListPlans {
            user_id: "u1".to_string(),
            status: Some("archived".to_string()),
        };
        assert!(matches!(
            PlanFilter::try_from(&params),
            Err(WaypointError::InvalidStatus { .. })
        ));

        let all = PlanFilter::try_from(&ListPlans {
            user_id: "u1".to_string(),
            status: None,
        })
        .unwrap();
        assert_eq!(all.status, None);
    }

    #[test]
    fn test_update_requests() {
        let request = UpdatePhaseRequest::from(UpdatePhase {
            id: 1,
            ..Default::default()
        });
        assert!(request.is_empty());

        let request = UpdateTaskRequest::try_from(UpdateTask {
            id: 1,
            priority: Some("low".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(!request.is_empty());
        assert_eq!(request.priority, Some(Priority::Low));

        assert!(UpdateTaskRequest::try_from(UpdateTask {
            id: 1,
            priority: Some("urgent".to_string()),
            ..Default::default()
        })
        .is_err());
    }
}
