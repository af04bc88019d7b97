//! Resource kinds handled outside of stack membership, and their cleanup order

/// CloudFormation type of a bucket owned by a stack
pub const S3_BUCKET_TYPE: &str = "AWS::S3::Bucket";

/// Kinds of leftover resources discovered by naming prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum OrphanKind {
    /// CloudWatch metric alarm
    #[strum(serialize = "alarm")]
    Alarm,
    /// SNS topic (identified by ARN)
    #[strum(serialize = "topic")]
    Topic,
    /// CloudWatch Logs log group
    #[strum(serialize = "log group")]
    LogGroup,
}

impl OrphanKind {
    /// Get cleanup priority (lower number = cleanup first)
    ///
    /// Alarms publish to topics, so they go first. Log groups have no
    /// dependents.
    pub fn cleanup_priority(self) -> u8 {
        match self {
            OrphanKind::Alarm => 0,
            OrphanKind::Topic => 1,
            OrphanKind::LogGroup => 2,
        }
    }

    /// All kinds in cleanup order
    pub fn in_cleanup_order() -> Vec<OrphanKind> {
        use strum::IntoEnumIterator;
        let mut kinds: Vec<_> = OrphanKind::iter().collect();
        kinds.sort_by_key(|k| k.cleanup_priority());
        kinds
    }
}
