//! The upload size limit is inclusive and a rejected upload leaves nothing
//! behind, for any content length and limit.

use clawio_core::Identity;
use clawio_store::{BlobStore, StoreConfig, StoreError};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn limit_is_inclusive(
        data in prop::collection::vec(any::<u8>(), 0..2048),
        limit in 0u64..2048,
    ) {
        let root = tempfile::tempdir().unwrap();
        let data_dir = root.path().join("data");
        let temp_dir = root.path().join("tmp");
        std::fs::create_dir_all(data_dir.join("t/test")).unwrap();
        std::fs::create_dir_all(&temp_dir).unwrap();

        let store = BlobStore::new(StoreConfig::new(&data_dir, &temp_dir).with_checksum("adler32"));
        let user = Identity::new("test").unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = rt.block_on(store.upload(&user, "blob", &data[..], limit, None));

        let target = data_dir.join("t/test/blob");
        if data.len() as u64 <= limit {
            prop_assert!(result.is_ok());
            prop_assert_eq!(std::fs::read(&target).unwrap(), data);
        } else {
            prop_assert!(
                matches!(result, Err(StoreError::RequestTooLarge { limit: l }) if l == limit),
                "unexpected result {:?}", result
            );
            prop_assert!(!target.exists());
        }
        prop_assert_eq!(std::fs::read_dir(&temp_dir).unwrap().count(), 0);
    }
}
