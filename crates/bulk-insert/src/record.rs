//! Synthetic record generation.

use crate::plan::BatchRange;
use uuid::Uuid;

/// A synthetic row for the `(id UUID, email TEXT)` target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: Uuid,
    pub email: String,
}

impl Record {
    /// Generate the record at a global workload index.
    ///
    /// The email is derived from the index alone (`user{index + 1}@test.com`),
    /// so the same index always yields the same email. Emails repeat across
    /// runs and across concurrent requests. The id is a fresh UUID v4.
    pub fn generate(index: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email_for(index),
        }
    }
}

/// Email for a global workload index.
pub fn email_for(index: u64) -> String {
    format!("user{}@test.com", index + 1)
}

/// Generate every record of a range, in index order.
pub fn generate_range(range: BatchRange) -> Vec<Record> {
    (range.start..range.end()).map(Record::generate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_one_based() {
        assert_eq!(Record::generate(0).email, "user1@test.com");
        assert_eq!(Record::generate(24).email, "user25@test.com");
    }

    #[test]
    fn test_ids_are_v4_and_distinct() {
        let a = Record::generate(7);
        let b = Record::generate(7);
        assert_eq!(a.email, b.email);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.get_version_num(), 4);
    }

    #[test]
    fn test_generate_range_follows_start_index() {
        let records = generate_range(BatchRange::new(20, 5));
        let emails: Vec<&str> = records.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(
            emails,
            vec![
                "user21@test.com",
                "user22@test.com",
                "user23@test.com",
                "user24@test.com",
                "user25@test.com",
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_generation_needs_no_coordination() {
        let handles: Vec<_> = (0..8u64)
            .map(|i| tokio::spawn(async move { generate_range(BatchRange::new(i * 100, 100)) }))
            .collect();

        let mut emails = Vec::new();
        for handle in handles {
            emails.extend(handle.await.unwrap().into_iter().map(|r| r.email));
        }

        let expected: Vec<String> = (0..800).map(email_for).collect();
        assert_eq!(emails, expected);
    }
}
