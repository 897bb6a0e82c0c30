use crate::{DataType, Error, IndexType, MetricType, QuantizeType, Result};
use serde::{Deserialize, Serialize};

/// Index construction parameters. The variant set is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexParams {
    Hnsw {
        metric: MetricType,
        m: u32,
        ef_construction: u32,
        quantize: QuantizeType,
    },
    Ivf {
        metric: MetricType,
        n_list: u32,
        n_iters: u32,
        use_soar: bool,
        quantize: QuantizeType,
    },
    Flat {
        metric: MetricType,
        quantize: QuantizeType,
    },
    Invert {
        enable_range_optimization: bool,
    },
}

impl IndexParams {
    pub fn hnsw(metric: MetricType, m: u32, ef_construction: u32, quantize: QuantizeType) -> Self {
        IndexParams::Hnsw { metric, m, ef_construction, quantize }
    }

    pub fn ivf(
        metric: MetricType,
        n_list: u32,
        n_iters: u32,
        use_soar: bool,
        quantize: QuantizeType,
    ) -> Self {
        IndexParams::Ivf { metric, n_list, n_iters, use_soar, quantize }
    }

    pub fn flat(metric: MetricType, quantize: QuantizeType) -> Self {
        IndexParams::Flat { metric, quantize }
    }

    pub fn invert(enable_range_optimization: bool) -> Self {
        IndexParams::Invert { enable_range_optimization }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            IndexParams::Hnsw { .. } => IndexType::Hnsw,
            IndexParams::Ivf { .. } => IndexType::Ivf,
            IndexParams::Flat { .. } => IndexType::Flat,
            IndexParams::Invert { .. } => IndexType::Invert,
        }
    }

    /// Metric of a vector index; `None` for the inverted index.
    pub fn metric(&self) -> Option<MetricType> {
        match self {
            IndexParams::Hnsw { metric, .. }
            | IndexParams::Ivf { metric, .. }
            | IndexParams::Flat { metric, .. } => Some(*metric),
            IndexParams::Invert { .. } => None,
        }
    }

    pub fn quantize(&self) -> Option<QuantizeType> {
        match self {
            IndexParams::Hnsw { quantize, .. }
            | IndexParams::Ivf { quantize, .. }
            | IndexParams::Flat { quantize, .. } => Some(*quantize),
            IndexParams::Invert { .. } => None,
        }
    }

    pub fn is_vector_index(&self) -> bool {
        !matches!(self, IndexParams::Invert { .. })
    }

    /// Check that these parameters can index a column of `data_type`.
    pub fn validate_for(&self, column: &str, data_type: DataType) -> Result<()> {
        match self {
            IndexParams::Invert { .. } => {
                if !(data_type.is_scalar() || data_type.is_array()) {
                    return Err(Error::InvalidArgument(format!(
                        "inverted index cannot be built on {} column '{}'",
                        data_type, column
                    )));
                }
            }
            _ => {
                if !data_type.is_vector() {
                    return Err(Error::InvalidArgument(format!(
                        "{} index requires a vector column, '{}' is {}",
                        self.index_type().name(),
                        column,
                        data_type
                    )));
                }
                if self.metric() == Some(MetricType::Undefined) {
                    return Err(Error::InvalidArgument(format!(
                        "{} index on '{}' needs a metric",
                        self.index_type().name(),
                        column
                    )));
                }
                let quantize = self.quantize().unwrap_or(QuantizeType::Undefined);
                if quantize != QuantizeType::Undefined && !data_type.is_float_vector() {
                    return Err(Error::InvalidArgument(format!(
                        "{} quantization is only valid for float vectors, '{}' is {}",
                        quantize.name(),
                        column,
                        data_type
                    )));
                }
                if data_type.is_sparse_vector() && matches!(self, IndexParams::Ivf { .. }) {
                    return Err(Error::InvalidArgument(format!(
                        "IVF index does not support sparse column '{}'",
                        column
                    )));
                }
                if let IndexParams::Hnsw { m, ef_construction, .. } = self {
                    if *m == 0 || *ef_construction == 0 {
                        return Err(Error::InvalidArgument(
                            "HNSW m and ef_construction must be positive".to_string(),
                        ));
                    }
                }
                if let IndexParams::Ivf { n_list, .. } = self {
                    if *n_list == 0 {
                        return Err(Error::InvalidArgument("IVF n_list must be positive".to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Query-time tuning parameters. The variant set is closed and each variant
/// only applies to the index variant of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryParams {
    Hnsw { ef_search: u32 },
    Ivf { nprobe: u32 },
}

impl QueryParams {
    pub fn hnsw(ef_search: u32) -> Self {
        QueryParams::Hnsw { ef_search }
    }

    pub fn ivf(nprobe: u32) -> Self {
        QueryParams::Ivf { nprobe }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            QueryParams::Hnsw { .. } => IndexType::Hnsw,
            QueryParams::Ivf { .. } => IndexType::Ivf,
        }
    }

    /// Check these parameters against the index built on `field`.
    pub fn validate_against(&self, field: &str, index: &IndexParams) -> Result<()> {
        match (self, index) {
            (QueryParams::Hnsw { ef_search }, IndexParams::Hnsw { .. }) => {
                if *ef_search == 0 {
                    return Err(Error::InvalidArgument("ef_search must be positive".to_string()));
                }
                Ok(())
            }
            (QueryParams::Ivf { nprobe }, IndexParams::Ivf { .. }) => {
                if *nprobe == 0 {
                    return Err(Error::InvalidArgument("nprobe must be positive".to_string()));
                }
                Ok(())
            }
            _ => Err(Error::InvalidArgument(format!(
                "{} query params do not match the {} index on '{}'",
                self.index_type().name(),
                index.index_type().name(),
                field
            ))),
        }
    }
}
