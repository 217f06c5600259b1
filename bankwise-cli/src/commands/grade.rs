use anyhow::{Result, bail};
use bankwise_lessons::GradeScale;
use clap::Args;

#[derive(Args, Debug)]
pub struct GradeArgs {
    /// Final score (0-100)
    pub score: f64,

    /// Use the plus/minus scale
    #[arg(long)]
    pub plus_minus: bool,
}

pub fn run(args: GradeArgs) -> Result<()> {
    let scale = if args.plus_minus {
        GradeScale::PlusMinus
    } else {
        GradeScale::Simple
    };
    println!("{}", grade(args.score, scale)?);
    Ok(())
}

fn grade(score: f64, scale: GradeScale) -> Result<String> {
    if !(0.0..=100.0).contains(&score) {
        bail!("score must be between 0 and 100, got {score}");
    }
    Ok(scale.grade(score).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_scales() {
        assert_eq!(grade(91.0, GradeScale::Simple).unwrap(), "A");
        assert_eq!(grade(91.0, GradeScale::PlusMinus).unwrap(), "A-");
        assert_eq!(grade(12.0, GradeScale::Simple).unwrap(), "F");
    }

    #[test]
    fn test_out_of_range_is_error() {
        assert!(grade(101.0, GradeScale::Simple).is_err());
        assert!(grade(-1.0, GradeScale::Simple).is_err());
        assert!(grade(f64::NAN, GradeScale::Simple).is_err());
    }
}
