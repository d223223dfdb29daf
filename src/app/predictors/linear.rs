use crate::app::math::Operand;
use crate::core::archive::{Archivable, Archiver, Unarchiver};
use crate::core::description::{Describable, ObjectDescription};
use crate::utils::error::{IrError, Result};

/// 線性預測器：`w · x + b`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearPredictor {
    weights: Vec<f64>,
    bias: f64,
}

impl LinearPredictor {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn from_description(description: &ObjectDescription) -> Result<Self> {
        Ok(Self {
            weights: description.property_value("weights")?,
            bias: description.property_value("bias")?,
        })
    }

    pub fn dimension(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    fn check_dimension(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.dimension() {
            return Err(IrError::dimension_mismatch(
                "linear predictor input",
                self.dimension(),
                input.len(),
            ));
        }
        Ok(())
    }

    pub fn predict(&self, input: &[f64]) -> Result<f64> {
        self.check_dimension(input)?;
        Ok(f64::dot(&self.weights, input)? + self.bias)
    }

    /// 各維度的加權值 `w[i] * x[i]`
    pub fn weighted_elements(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_dimension(input)?;
        Ok(self.weights.iter().zip(input).map(|(w, x)| w * x).collect())
    }
}

impl Describable for LinearPredictor {
    fn type_name() -> &'static str {
        "LinearPredictor"
    }

    fn type_description() -> ObjectDescription {
        let mut description = ObjectDescription::for_type::<Self>("Linear predictor");
        description
            .add_property::<Vec<f64>>("weights", "Weight vector")
            .add_property::<f64>("bias", "Bias term");
        description
    }

    fn runtime_type_name(&self) -> &str {
        Self::type_name()
    }

    fn description(&self) -> Result<ObjectDescription> {
        let mut description = Self::type_description();
        description.set_property_value("weights", self.weights.clone())?;
        description.set_property_value("bias", self.bias)?;
        Ok(description)
    }
}

impl Archivable for LinearPredictor {
    fn write_to_archive(&self, archiver: &mut Archiver) -> Result<()> {
        archiver.write("weights", &self.weights)?;
        archiver.write("bias", &self.bias)
    }

    fn read_from_archive(&mut self, unarchiver: &Unarchiver<'_>) -> Result<()> {
        self.weights = unarchiver.read("weights")?;
        self.bias = unarchiver.read("bias")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict() {
        let predictor = LinearPredictor::new(vec![1.0, 2.0, 3.0], 0.5);
        assert_eq!(predictor.dimension(), 3);
        assert_eq!(predictor.predict(&[1.0, 1.0, 1.0]).unwrap(), 6.5);
        assert_eq!(
            predictor.weighted_elements(&[1.0, 1.0, 1.0]).unwrap(),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let predictor = LinearPredictor::new(vec![1.0, 2.0], 0.0);
        let err = predictor.predict(&[1.0]).unwrap_err();
        assert!(matches!(err, IrError::DimensionMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_description_roundtrip() {
        let predictor = LinearPredictor::new(vec![0.25, -1.0], 2.0);
        let description = predictor.description().unwrap();
        assert_eq!(LinearPredictor::from_description(&description).unwrap(), predictor);
    }
}
