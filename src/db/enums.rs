use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// 以 Text 列存储的枚举，统一生成 serde、Display/FromStr 与 diesel 转换
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Unrecognized {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                s.parse::<$name>().map_err(Into::into)
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }
    };
}

text_enum! {
    SupervisionType {
        Regular => "regular",
        Emergency => "emergency",
        Key => "key",
        FollowUp => "follow_up",
    }
}

text_enum! {
    Urgency {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

text_enum! {
    SupervisionStatus {
        Draft => "draft",
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Overdue => "overdue",
        Suspended => "suspended",
        Cancelled => "cancelled",
    }
}

impl SupervisionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SupervisionStatus::Completed | SupervisionStatus::Cancelled)
    }

    /// 督办事项允许的状态流转
    pub fn can_transition_to(&self, next: SupervisionStatus) -> bool {
        use SupervisionStatus::*;
        match (self, next) {
            (Draft, Pending | Cancelled) => true,
            (Pending, InProgress | Suspended | Cancelled | Overdue | Completed) => true,
            (InProgress, Completed | Suspended | Overdue | Cancelled) => true,
            (Overdue, InProgress | Completed | Suspended | Cancelled) => true,
            (Suspended, Pending | InProgress | Cancelled) => true,
            _ => false,
        }
    }

    /// 仍在办理中的状态（参与逾期与预警判断）
    pub fn is_open(&self) -> bool {
        matches!(self, SupervisionStatus::Pending | SupervisionStatus::InProgress)
    }
}

text_enum! {
    TaskStatus {
        Assigned => "assigned",
        Accepted => "accepted",
        InProgress => "in_progress",
        Completed => "completed",
        Rejected => "rejected",
        Overdue => "overdue",
    }
}

impl TaskStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TaskStatus::Assigned | TaskStatus::Accepted | TaskStatus::InProgress
        )
    }
}

text_enum! {
    StatusAction {
        Create => "create",
        StatusChange => "status_change",
        AutoStatusChange => "auto_status_change",
        Evaluate => "evaluate",
    }
}

text_enum! {
    WorkflowStatus {
        Draft => "draft",
        Active => "active",
        Suspended => "suspended",
        Completed => "completed",
        Terminated => "terminated",
    }
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Terminated)
    }
}

text_enum! {
    NodeType {
        Start => "start",
        End => "end",
        Task => "task",
        Decision => "decision",
        Parallel => "parallel",
        Merge => "merge",
    }
}

text_enum! {
    NodeStatus {
        Pending => "pending",
        Active => "active",
        Completed => "completed",
        Skipped => "skipped",
        Failed => "failed",
    }
}

impl NodeStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Skipped)
    }
}

text_enum! {
    AlertType {
        Overdue => "overdue",
        UpcomingDeadline => "upcoming_deadline",
        SlowProgress => "slow_progress",
        TaskOverdue => "task_overdue",
        HighWorkload => "high_workload",
        UrgentNoProgress => "urgent_no_progress",
        QualityRisk => "quality_risk",
    }
}

text_enum! {
    /// 预警级别，声明顺序即严重程度
    AlertLevel {
        Normal => "normal",
        Attention => "attention",
        Warning => "warning",
        Critical => "critical",
    }
}

text_enum! {
    NotificationType {
        System => "system",
        Task => "task",
        Reminder => "reminder",
        Warning => "warning",
        Approval => "approval",
    }
}

text_enum! {
    NotificationStatus {
        Pending => "pending",
        Sent => "sent",
        Read => "read",
        Failed => "failed",
    }
}

text_enum! {
    NotificationChannel {
        System => "system",
        Email => "email",
        Sms => "sms",
        Wechat => "wechat",
        Push => "push",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for status in SupervisionStatus::ALL {
            assert_eq!(status.as_str().parse::<SupervisionStatus>().unwrap(), *status);
        }
        assert_eq!(SupervisionType::FollowUp.as_str(), "follow_up");
        assert!("unknown".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_names() {
        let json = serde_json::to_string(&AlertType::UrgentNoProgress).unwrap();
        assert_eq!(json, "\"urgent_no_progress\"");
        let parsed: WorkflowStatus = serde_json::from_str("\"terminated\"").unwrap();
        assert_eq!(parsed, WorkflowStatus::Terminated);
    }

    #[test]
    fn test_alert_level_ordering() {
        assert!(AlertLevel::Critical > AlertLevel::Warning);
        assert!(AlertLevel::Warning > AlertLevel::Attention);
        assert!(AlertLevel::Attention > AlertLevel::Normal);
    }

    #[test]
    fn test_supervision_transitions() {
        use SupervisionStatus::*;
        assert!(Draft.can_transition_to(Pending));
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Overdue.can_transition_to(Completed));
        assert!(Suspended.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Draft));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Draft.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
    }
}
