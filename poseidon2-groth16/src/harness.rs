//! The prove-then-verify sequence.
//!
//! [`run`] asks a [`FullProver`] for a proof of a circuit input exactly once, then hands the
//! proof to a [`ProofVerifier`] exactly once. A failed verification is a result, not an error;
//! a failure to prove or to run the verifier aborts the sequence and is returned to the caller.

use std::collections::BTreeMap;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use circom_types::groth16::{Groth16Proof, PublicSignals};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::Groth16Error;
use crate::circom::Poseidon2Input;
use crate::circom::proof_input::ProofInput;

/// A proof together with the public signals it commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOutput {
    /// The proof in snarkjs form
    pub proof: Groth16Proof,
    /// The public signals, for the Poseidon2 circuit the hash output
    pub public_signals: PublicSignals<Fr>,
}

/// Computes the witness for an input and proves it.
pub trait FullProver<I = Poseidon2Input> {
    /// Generates a proof for `input`.
    fn full_prove(&self, input: &I) -> Result<ProofOutput, Groth16Error>;
}

/// Checks a proof against a verification key.
pub trait ProofVerifier {
    /// Returns whether `proof` is valid for `public_signals`.
    fn verify(
        &self,
        public_signals: &PublicSignals<Fr>,
        proof: &Groth16Proof,
    ) -> Result<bool, Groth16Error>;
}

/// The outcome of one run, serialized as `{proof, publicSignals, verified}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessReport {
    /// The generated proof
    pub proof: Groth16Proof,
    /// The public signals of the proof
    #[serde(rename = "publicSignals")]
    pub public_signals: PublicSignals<Fr>,
    /// Whether the verifier accepted the proof
    pub verified: bool,
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The prover failed, the verifier was not called.
    #[error("proving failed")]
    Prove(#[source] Groth16Error),
    /// The verifier could not reach a verdict.
    #[error("verification failed")]
    Verify(#[source] Groth16Error),
}

/// Proves `input` once and verifies the result once.
///
/// Errors are returned, not logged.
#[instrument(level = "info", skip_all)]
pub fn run<I: ProofInput>(
    prover: &impl FullProver<I>,
    verifier: &impl ProofVerifier,
    input: &I,
) -> Result<HarnessReport, HarnessError> {
    let signals = input
        .prepare_input()
        .into_iter()
        .map(|(name, values)| (name, values.iter().map(ToString::to_string).collect::<Vec<_>>()))
        .collect::<BTreeMap<_, _>>();
    tracing::info!(input = ?signals, "generating proof");
    let ProofOutput {
        proof,
        public_signals,
    } = prover.full_prove(input).map_err(HarnessError::Prove)?;

    let signals = public_signals
        .as_ref()
        .iter()
        .map(|s| s.into_bigint().to_string())
        .collect::<Vec<_>>();
    tracing::info!(?signals, "public signals");
    match serde_json::to_string(&proof) {
        Ok(json) => tracing::info!(proof = %json, "proof"),
        Err(err) => tracing::warn!(%err, "could not render proof"),
    }

    let verified = verifier
        .verify(&public_signals, &proof)
        .map_err(HarnessError::Verify)?;
    if verified {
        tracing::info!("valid proof");
    } else {
        tracing::info!("invalid proof");
    }

    Ok(HarnessReport {
        proof,
        public_signals,
        verified,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;
    use std::sync::{Arc, Mutex};

    use ark_bn254::Fr;
    use circom_types::groth16::{Groth16Proof, PublicSignals};

    use super::{FullProver, HarnessError, HarnessReport, ProofOutput, ProofVerifier, run};
    use crate::Groth16Error;
    use crate::circom::Poseidon2Input;
    use crate::verifier::tests::product_fixture;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs the harness on the fixed input and returns its outcome with everything it logged.
    fn run_logged(
        prover: &impl FullProver,
        verifier: &impl ProofVerifier,
    ) -> (Result<HarnessReport, HarnessError>, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, || {
            run(prover, verifier, &Poseidon2Input::default())
        });
        let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    struct CountingProver {
        calls: Cell<usize>,
        fail: bool,
        seen: Cell<Option<Poseidon2Input>>,
    }

    impl CountingProver {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
                seen: Cell::new(None),
            }
        }
    }

    impl FullProver for CountingProver {
        fn full_prove(&self, input: &Poseidon2Input) -> Result<ProofOutput, Groth16Error> {
            self.calls.set(self.calls.get() + 1);
            self.seen.set(Some(*input));
            if self.fail {
                return Err(Groth16Error::WitnessGeneration(eyre::eyre!("wasm trapped")));
            }
            let (_, proof, public_signals) = product_fixture();
            Ok(ProofOutput {
                proof,
                public_signals,
            })
        }
    }

    struct CountingVerifier {
        calls: Cell<usize>,
        verdict: Result<bool, ()>,
    }

    impl CountingVerifier {
        fn new(verdict: Result<bool, ()>) -> Self {
            Self {
                calls: Cell::new(0),
                verdict,
            }
        }
    }

    impl ProofVerifier for CountingVerifier {
        fn verify(
            &self,
            _: &PublicSignals<Fr>,
            _: &Groth16Proof,
        ) -> Result<bool, Groth16Error> {
            self.calls.set(self.calls.get() + 1);
            self.verdict.map_err(|()| {
                Groth16Error::VerificationKey(std::io::ErrorKind::NotFound.into())
            })
        }
    }

    #[test]
    fn proves_once_and_verifies_once() {
        let prover = CountingProver::new(false);
        let verifier = CountingVerifier::new(Ok(true));
        run(&prover, &verifier, &Poseidon2Input::default()).unwrap();
        assert_eq!(prover.calls.get(), 1);
        assert_eq!(verifier.calls.get(), 1);
        assert_eq!(prover.seen.get(), Some(Poseidon2Input::default()));
    }

    #[test]
    fn failed_proving_skips_verification() {
        let prover = CountingProver::new(true);
        let verifier = CountingVerifier::new(Ok(true));
        let err = run(&prover, &verifier, &Poseidon2Input::default()).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Prove(Groth16Error::WitnessGeneration(_))
        ));
        assert_eq!(prover.calls.get(), 1);
        assert_eq!(verifier.calls.get(), 0);
    }

    #[test]
    fn invalid_proof_still_completes() {
        let prover = CountingProver::new(false);
        let verifier = CountingVerifier::new(Ok(false));
        let (report, logs) = run_logged(&prover, &verifier);
        assert!(!report.unwrap().verified);
        assert_eq!(verifier.calls.get(), 1);
        assert!(logs.contains("invalid proof"), "{logs}");
    }

    #[test]
    fn valid_proof_is_reported() {
        let prover = CountingProver::new(false);
        let verifier = CountingVerifier::new(Ok(true));
        let (report, logs) = run_logged(&prover, &verifier);
        let report = report.unwrap();
        assert!(report.verified);
        let (_, proof, public_signals) = product_fixture();
        assert_eq!(report.proof, proof);
        assert_eq!(report.public_signals, public_signals);
        assert!(logs.contains("valid proof"), "{logs}");
        assert!(!logs.contains("invalid proof"), "{logs}");
    }

    #[test]
    fn logs_input_and_public_signals() {
        let prover = CountingProver::new(false);
        let verifier = CountingVerifier::new(Ok(true));
        let (_, logs) = run_logged(&prover, &verifier);
        assert!(logs.contains("123456789"), "{logs}");
        assert!(logs.contains("987654321"), "{logs}");
        assert!(logs.contains("121932631112635269"), "{logs}");
    }

    #[test]
    fn failures_are_returned_without_logging() {
        let (err, logs) = run_logged(&CountingProver::new(true), &CountingVerifier::new(Ok(true)));
        assert!(matches!(err, Err(HarnessError::Prove(_))));
        assert!(!logs.contains("ERROR"), "{logs}");

        let (err, logs) = run_logged(&CountingProver::new(false), &CountingVerifier::new(Err(())));
        assert!(matches!(err, Err(HarnessError::Verify(_))));
        assert!(!logs.contains("ERROR"), "{logs}");
        assert!(!logs.contains("valid proof"), "{logs}");
    }

    #[test]
    fn verifier_failure_is_an_error() {
        let prover = CountingProver::new(false);
        let verifier = CountingVerifier::new(Err(()));
        let err = run(&prover, &verifier, &Poseidon2Input::default()).unwrap_err();
        assert!(matches!(err, HarnessError::Verify(_)));
        assert_eq!(prover.calls.get(), 1);
    }

    #[test]
    fn verification_key_checks_real_proof() {
        let (vk, proof, public_signals) = product_fixture();
        let prover = CountingProver::new(false);
        let report = run(&prover, &vk, &Poseidon2Input::default()).unwrap();
        assert!(report.verified);

        struct Tampered(ProofOutput);
        impl FullProver for Tampered {
            fn full_prove(&self, _: &Poseidon2Input) -> Result<ProofOutput, Groth16Error> {
                Ok(self.0.clone())
            }
        }
        let tampered = Tampered(ProofOutput {
            proof,
            public_signals: vec![public_signals.as_ref()[0] + Fr::from(1u64)].into(),
        });
        assert!(!run(&tampered, &vk, &Poseidon2Input::default()).unwrap().verified);
    }

    #[test]
    fn report_uses_snarkjs_field_names() {
        let (_, proof, public_signals) = product_fixture();
        let report = HarnessReport {
            proof,
            public_signals,
            verified: true,
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert!(object["publicSignals"].is_array());
        assert_eq!(object["verified"], serde_json::Value::Bool(true));
        assert_eq!(object["proof"]["protocol"], "groth16");
        let back: HarnessReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
