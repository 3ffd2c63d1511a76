//! Recovery phrase backup verification.
//!
//! A freshly generated mnemonic must be proven written down before the
//! caller gets it back:
//!
//! ```text
//! ShowMnemonic → Verify { 3 positions } → Complete
//!      ^                  |
//!      +---- mismatch ----+
//! ```
//!
//! The user is asked for three distinct word positions. Any wrong answer
//! sends the flow back to [`BackupState::ShowMnemonic`]; the next attempt
//! asks for a fresh set of positions. The mnemonic is zeroized on drop in
//! every state.

use rand::seq::index::sample;
use rand::Rng;
use vindex_crypto::mnemonic::{Mnemonic, WORD_COUNT};
use vindex_types::{Result, VindexError};

/// Number of words the user must repeat back.
pub const VERIFY_WORDS: usize = 3;

// ---------------------------------------------------------------------------
// BackupState
// ---------------------------------------------------------------------------

/// States of the backup verification flow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackupState {
    /// The phrase may be displayed.
    ShowMnemonic,
    /// Waiting for the words at these zero-based positions, ascending.
    Verify { positions: [usize; VERIFY_WORDS] },
    /// Verified. The mnemonic may be released.
    Complete,
}

// ---------------------------------------------------------------------------
// BackupFlow
// ---------------------------------------------------------------------------

/// State machine gating release of a new mnemonic.
pub struct BackupFlow {
    state: BackupState,
    mnemonic: Mnemonic,
}

impl BackupFlow {
    /// Starts a flow in [`BackupState::ShowMnemonic`].
    pub fn new(mnemonic: Mnemonic) -> Self {
        Self {
            state: BackupState::ShowMnemonic,
            mnemonic,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> BackupState {
        self.state
    }

    /// Words to display to the user.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::InvalidState`] outside
    /// [`BackupState::ShowMnemonic`].
    pub fn words_to_show(&self) -> Result<Vec<&str>> {
        if self.state != BackupState::ShowMnemonic {
            return Err(VindexError::InvalidState {
                reason: "the phrase is only shown before verification".into(),
            });
        }
        Ok(self.mnemonic.words())
    }

    /// Moves to [`BackupState::Verify`] with randomly chosen positions and
    /// returns them.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::InvalidState`] outside
    /// [`BackupState::ShowMnemonic`].
    pub fn begin_verification(&mut self) -> Result<[usize; VERIFY_WORDS]> {
        self.begin_verification_with(&mut rand::thread_rng())
    }

    /// Same as [`BackupFlow::begin_verification`] with a caller-supplied RNG.
    pub fn begin_verification_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<[usize; VERIFY_WORDS]> {
        if self.state != BackupState::ShowMnemonic {
            return Err(VindexError::InvalidState {
                reason: "verification can only start from ShowMnemonic".into(),
            });
        }

        let positions = pick_positions(rng);
        self.state = BackupState::Verify { positions };
        Ok(positions)
    }

    /// Checks the user's answers, in the order of the requested positions.
    ///
    /// Answers are trimmed and compared case-insensitively. All must match.
    ///
    /// # Errors
    ///
    /// - [`VindexError::InvalidState`] outside [`BackupState::Verify`].
    /// - [`VindexError::VerificationFailed`] on any mismatch; the flow
    ///   returns to [`BackupState::ShowMnemonic`].
    pub fn verify<S: AsRef<str>>(&mut self, answers: &[S]) -> Result<()> {
        let positions = match self.state {
            BackupState::Verify { positions } => positions,
            _ => {
                return Err(VindexError::InvalidState {
                    reason: "no verification in progress".into(),
                })
            }
        };

        let all_match = answers.len() == VERIFY_WORDS
            && positions.iter().zip(answers).all(|(&pos, answer)| {
                self.mnemonic
                    .word(pos)
                    .is_some_and(|word| word.eq_ignore_ascii_case(answer.as_ref().trim()))
            });

        if !all_match {
            self.state = BackupState::ShowMnemonic;
            return Err(VindexError::VerificationFailed);
        }

        self.state = BackupState::Complete;
        Ok(())
    }

    /// Returns `true` once verification has succeeded.
    pub fn is_complete(&self) -> bool {
        self.state == BackupState::Complete
    }

    /// Releases the verified mnemonic.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::VerificationFailed`] unless the flow is
    /// [`BackupState::Complete`]; the flow is consumed either way.
    pub fn into_mnemonic(self) -> Result<Mnemonic> {
        if self.state != BackupState::Complete {
            return Err(VindexError::VerificationFailed);
        }
        Ok(self.mnemonic)
    }
}

fn pick_positions<R: Rng + ?Sized>(rng: &mut R) -> [usize; VERIFY_WORDS] {
    let picked = sample(rng, WORD_COUNT, VERIFY_WORDS);
    let mut positions = [0usize; VERIFY_WORDS];
    for (slot, index) in positions.iter_mut().zip(picked.iter()) {
        *slot = index;
    }
    positions.sort_unstable();
    positions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
