//! snarkjs backend
//!
//! Shells out to `snarkjs groth16 fullprove`, which computes the circuit
//! witness from the WASM artifact and proves it with the proving key:
//!
//! ```text
//! input.json ─▶ snarkjs groth16 fullprove input.json vote.wasm vote.zkey
//!                                          proof.json public.json
//! ```
//!
//! Every run uses its own temporary directory; the witness file is removed
//! with it.

use std::path::{Path, PathBuf};
use std::process::Command;

use shadowvote_ballot::{BackendProof, PublicSignals, Witness};
use tracing::debug;

use super::{BackendError, ProverOutput, ProvingBackend};

#[derive(Debug, Clone)]
pub struct SnarkjsBackend {
    program: String,
    wasm: PathBuf,
    zkey: PathBuf,
}

impl SnarkjsBackend {
    /// Fails if either circuit artifact is missing
    pub fn new(
        program: impl Into<String>,
        wasm: impl Into<PathBuf>,
        zkey: impl Into<PathBuf>,
    ) -> Result<Self, BackendError> {
        let backend = Self {
            program: program.into(),
            wasm: wasm.into(),
            zkey: zkey.into(),
        };
        backend.check_artifacts()?;
        Ok(backend)
    }

    pub fn wasm_path(&self) -> &Path {
        &self.wasm
    }

    pub fn zkey_path(&self) -> &Path {
        &self.zkey
    }

    fn check_artifacts(&self) -> Result<(), BackendError> {
        for path in [&self.wasm, &self.zkey] {
            if !path.is_file() {
                return Err(BackendError::MissingArtifact(path.clone()));
            }
        }
        Ok(())
    }
}

impl ProvingBackend for SnarkjsBackend {
    fn prove(&self, witness: &Witness) -> Result<ProverOutput, BackendError> {
        self.check_artifacts()?;

        let workdir = tempfile::Builder::new().prefix("shadowvote-").tempdir()?;
        let input_path = workdir.path().join("input.json");
        let proof_path = workdir.path().join("proof.json");
        let public_path = workdir.path().join("public.json");

        std::fs::write(&input_path, witness.to_circuit_input()?)?;

        debug!(program = %self.program, wasm = %self.wasm.display(), "running groth16 fullprove");
        let output = Command::new(&self.program)
            .arg("groth16")
            .arg("fullprove")
            .arg(&input_path)
            .arg(&self.wasm)
            .arg(&self.zkey)
            .arg(&proof_path)
            .arg(&public_path)
            .output()
            .map_err(|source| BackendError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            // snarkjs reports most errors on stdout
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(BackendError::Failed {
                status: output.status.to_string(),
                stderr: detail.trim().to_string(),
            });
        }

        let proof = BackendProof::from_snarkjs_json(&std::fs::read_to_string(&proof_path)?)?;
        let public_signals =
            PublicSignals::from_snarkjs_json(&std::fs::read_to_string(&public_path)?)?;

        Ok(ProverOutput {
            proof,
            public_signals,
        })
    }
}
