use log::debug;
use ndarray::{s, ArrayView2};
use num_complex::Complex64;

use crate::array::geometry::ArrayGeometry;
use crate::array::subspace::SubspacePartition;
use crate::math::matrix::MatrixHelper;
use crate::prelude::{AngleEstimator, EngineError, EngineResult};

/// ESPRIT direction finder for a uniform linear array.
///
/// The signal subspace of the first `m - 1` elements and that of the last
/// `m - 1` elements differ by a per-source phase rotation; the eigenvalues of
/// the least-squares rotation `Phi` carry the inter-element phase steps.
#[derive(Debug, Clone)]
pub struct EspritEstimator {
    geometry: ArrayGeometry,
}

impl EspritEstimator {
    pub fn new(geometry: ArrayGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &ArrayGeometry {
        &self.geometry
    }

    /// One angle per source, in radians. The order follows the eigensolver and
    /// carries no meaning.
    pub fn estimate(
        &self,
        signal: ArrayView2<Complex64>,
        sources: usize,
    ) -> EngineResult<Vec<f64>> {
        let elements = self.geometry.elements();
        if sources == 0 || sources >= elements {
            return Err(EngineError::Configuration(format!(
                "source count {} must lie in [1, {})",
                sources, elements
            )));
        }
        if signal.dim() != (elements, sources) {
            return Err(EngineError::Validation(format!(
                "signal subspace has shape {:?}, expected {:?}",
                signal.dim(),
                (elements, sources)
            )));
        }

        let leading = signal.slice(s![..elements - 1, ..]);
        let trailing = signal.slice(s![1.., ..]);
        let trailing_adjoint = MatrixHelper::adjoint(trailing);

        let gram = trailing_adjoint.dot(&trailing);
        let cross = trailing_adjoint.dot(&leading);
        let rotation = MatrixHelper::solve_hermitian(gram.view(), cross.view())?;
        let eigenvalues = MatrixHelper::eigenvalues(rotation.view())?;
        debug!("esprit rotation eigenvalues {:?}", eigenvalues);

        Ok(eigenvalues
            .iter()
            .map(|chi| self.geometry.angle_from_omega(-chi.arg()))
            .collect())
    }
}

impl AngleEstimator for EspritEstimator {
    fn estimate_angles(&self, partition: &SubspacePartition) -> EngineResult<Vec<f64>> {
        self.estimate(partition.signal_vectors(), partition.sources())
    }
}
