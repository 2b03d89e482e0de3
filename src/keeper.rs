//! Boundary to the key-fragment keeper service. The crate only consumes
//! this interface; the HTTP service and its row store live elsewhere. The
//! handle is injected by the caller rather than held in process-wide
//! state, and a `(file_id, requestor_id)` pair maps to at most one stored
//! fragment at a time.

use quick_error::quick_error;

use std::collections::HashMap;

quick_error! {
  #[derive(Debug, PartialEq)]
  pub enum KeeperError {
      NotFound {
        display("No re-encryption key stored for this file and requestor")
      }
  }
}

pub trait FragmentKeeper {
    /// Atomic insert-or-replace under the `(file_id, requestor_id)` key.
    fn store(
        &mut self,
        file_id: &str,
        requestor_id: &str,
        kfrag: Vec<u8>,
    ) -> Result<(), KeeperError>;

    fn fetch(&self, file_id: &str, requestor_id: &str) -> Result<Vec<u8>, KeeperError>;

    /// Deleting an absent key reports `NotFound` rather than succeeding
    /// silently.
    fn delete(&mut self, file_id: &str, requestor_id: &str) -> Result<(), KeeperError>;
}

/// In-memory keeper used by tests and the demo binary.
pub struct MemoryKeeper {
    entries: HashMap<(String, String), Vec<u8>>,
}

impl MemoryKeeper {
    pub fn open() -> Self {
        MemoryKeeper {
            entries: HashMap::new(),
        }
    }
}

impl FragmentKeeper for MemoryKeeper {
    fn store(
        &mut self,
        file_id: &str,
        requestor_id: &str,
        kfrag: Vec<u8>,
    ) -> Result<(), KeeperError> {
        self.entries
            .insert((file_id.to_string(), requestor_id.to_string()), kfrag);
        Ok(())
    }

    fn fetch(&self, file_id: &str, requestor_id: &str) -> Result<Vec<u8>, KeeperError> {
        self.entries
            .get(&(file_id.to_string(), requestor_id.to_string()))
            .cloned()
            .ok_or(KeeperError::NotFound)
    }

    fn delete(&mut self, file_id: &str, requestor_id: &str) -> Result<(), KeeperError> {
        self.entries
            .remove(&(file_id.to_string(), requestor_id.to_string()))
            .map(|_| ())
            .ok_or(KeeperError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_fetch_delete() {
        let mut keeper = MemoryKeeper::open();
        assert_eq!(keeper.fetch("file-1", "org-2"), Err(KeeperError::NotFound));

        keeper
            .store("file-1", "org-2", vec![1, 2, 3])
            .expect("store succeeds");
        assert_eq!(keeper.fetch("file-1", "org-2"), Ok(vec![1, 2, 3]));

        // A second store for the same pair replaces the fragment.
        keeper
            .store("file-1", "org-2", vec![4, 5, 6])
            .expect("replace succeeds");
        assert_eq!(keeper.fetch("file-1", "org-2"), Ok(vec![4, 5, 6]));

        keeper.delete("file-1", "org-2").expect("delete succeeds");
        assert_eq!(keeper.delete("file-1", "org-2"), Err(KeeperError::NotFound));
    }
}
