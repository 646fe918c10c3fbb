//! Property tests for the reserve-then-fill placeholder protocol.

mod common;

use common::{fixed_options, one_page_pdf, MockSigner};
use pdf_seal::signatures::{read_signatures, PdfSigner};
use pdf_seal::{ErrorKind, PdfDocument};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: any signature that fits is stored left-justified and zero
    /// padded, and the file length only depends on the reserved capacity
    #[test]
    fn fitting_signature_is_padded(
        capacity in 1usize..300,
        signature in prop::collection::vec(any::<u8>(), 1..300),
    ) {
        prop_assume!(signature.len() <= capacity);
        let signer = MockSigner::new(capacity, signature.clone());
        let signed = PdfSigner::new(fixed_options()).sign_bytes(one_page_pdf(), &signer).unwrap();

        let single = MockSigner::new(capacity, vec![0xFF]);
        let baseline = PdfSigner::new(fixed_options()).sign_bytes(one_page_pdf(), &single).unwrap();
        prop_assert_eq!(signed.len(), baseline.len());

        let mut doc = PdfDocument::from_bytes(signed.clone()).unwrap();
        let info = read_signatures(&mut doc).unwrap().remove(0);
        prop_assert_eq!(info.contents.len(), capacity);
        prop_assert_eq!(&info.contents[..signature.len()], &signature[..]);
        prop_assert!(info.contents[signature.len()..].iter().all(|&b| b == 0));

        let byte_range = info.byte_range.unwrap();
        prop_assert!(byte_range.validate(signed.len()).is_ok());
        prop_assert_eq!(byte_range.excluded().len(), capacity * 2 + 2);
        prop_assert_eq!(byte_range.signed_content(&signed).unwrap(), signer.seen());
    }

    /// Property: a signature one byte over capacity is always rejected
    #[test]
    fn oversized_signature_is_rejected(capacity in 1usize..200) {
        let signer = MockSigner::new(capacity, vec![0xAB; capacity + 1]);
        let err = PdfSigner::new(fixed_options()).sign_bytes(one_page_pdf(), &signer).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    /// Property: an empty signature is never accepted, whatever the capacity
    #[test]
    fn empty_signature_is_rejected(capacity in 1usize..200) {
        let signer = MockSigner::new(capacity, Vec::new());
        let err = PdfSigner::new(fixed_options()).sign_bytes(one_page_pdf(), &signer).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Signer);
    }
}
