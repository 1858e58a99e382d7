//! Summary statistics
//!
//! Derives the per-subject behavioral summary from a segmented session.
//! Statistic names follow the flanker analysis column convention: `f` prefix,
//! `c`/`i` for congruent/incongruent, `pc`/`pe` for post-correct/post-error,
//! `n` for counts, `rtm`/`rtsd` for response time mean and deviation.
//!
//! Zero-denominator policy:
//! - means and deviations over an empty sample fail with `EmptySample`
//! - accuracies with an empty universe fail with `UndefinedRatio`
//! - post-trial mean response times with no qualifying trials are reported as 0

use crate::block::{Dataset, TrialFilter};
use crate::config::AnalysisConfig;
use crate::error::VmrkError;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Statistic names in output order
pub const STATISTIC_NAMES: [&str; 42] = [
    "fcn", "fen", "facc", "frtm", "frtsd", "frtmc", "frtsdc", "frtme", "frtsde", "fccn",
    "fcrtmc", "fcrtsdc", "fcen", "fcrtme", "fcrtsde", "fcacc", "ficn", "firtmc", "firtsdc",
    "fien", "firtme", "firtsde", "fiacc", "fpccn", "fpcen", "fpcertm", "fpecn", "fpecrtm",
    "fpeen", "fpeertm", "fpexn", "fpexrtm", "fpxen", "fpxertm", "faccpc", "faccpe", "fpes",
    "fpes2", "fpes3", "fan", "faen", "fscn",
];

/// Name of the subject identifier column
pub const SID_KEY: &str = "sid";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Count(usize),
    Real(f64),
}

impl StatValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            StatValue::Count(n) => n as f64,
            StatValue::Real(x) => x,
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            StatValue::Count(n) => serializer.serialize_u64(n as u64),
            StatValue::Real(x) => serializer.serialize_f64(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistic {
    pub name: &'static str,
    pub value: StatValue,
}

/// Ordered statistics for one session
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub sid: String,
    pub stats: Vec<Statistic>,
}

impl Summary {
    pub fn get(&self, name: &str) -> Option<StatValue> {
        self.stats.iter().find(|s| s.name == name).map(|s| s.value)
    }

    /// Column names, `sid` first
    pub fn keys(&self) -> Vec<&str> {
        std::iter::once(SID_KEY)
            .chain(self.stats.iter().map(|s| s.name))
            .collect()
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.stats.len() + 1))?;
        map.serialize_entry(SID_KEY, &self.sid)?;
        for stat in &self.stats {
            map.serialize_entry(stat.name, &stat.value)?;
        }
        map.end()
    }
}

/// Count and response time total of a post-trial condition
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PostTrial {
    count: usize,
    total_ms: f64,
}

impl PostTrial {
    /// Query each block separately, leaving out the first qualifying trial of every block
    fn collect(dataset: &Dataset, filter: &TrialFilter) -> Self {
        dataset
            .query_per_block(filter)
            .iter()
            .fold(Self::default(), |acc, times| Self {
                count: acc.count + times.len().saturating_sub(1),
                total_ms: acc.total_ms + times.iter().skip(1).sum::<f64>(),
            })
    }

    fn mean_or_zero(&self) -> f64 {
        if self.count > 0 {
            self.total_ms / self.count as f64
        } else {
            0.0
        }
    }
}

fn mean(name: &str, values: &[f64]) -> Result<f64, VmrkError> {
    if values.is_empty() {
        return Err(VmrkError::EmptySample(name.to_string()));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn std_dev(name: &str, values: &[f64], ddof: u32) -> Result<f64, VmrkError> {
    let n = values.len();
    if n <= ddof as usize {
        return Err(VmrkError::EmptySample(name.to_string()));
    }
    let mu = mean(name, values)?;
    let sum_sq: f64 = values.iter().map(|x| (x - mu).powi(2)).sum();
    Ok((sum_sq / (n - ddof as usize) as f64).sqrt())
}

fn ratio(name: &str, numerator: usize, denominator: usize) -> Result<f64, VmrkError> {
    if denominator == 0 {
        return Err(VmrkError::UndefinedRatio(name.to_string()));
    }
    Ok(numerator as f64 / denominator as f64)
}

#[derive(Default)]
struct SummaryBuilder {
    stats: Vec<Statistic>,
}

impl SummaryBuilder {
    fn count(&mut self, name: &'static str, n: usize) -> usize {
        self.stats.push(Statistic {
            name,
            value: StatValue::Count(n),
        });
        n
    }

    fn real(&mut self, name: &'static str, x: f64) -> f64 {
        self.stats.push(Statistic {
            name,
            value: StatValue::Real(x),
        });
        x
    }

    /// Count, mean and deviation of one condition
    fn sample(
        &mut self,
        names: (&'static str, &'static str, &'static str),
        values: &[f64],
        ddof: u32,
    ) -> Result<usize, VmrkError> {
        let (count, mean_name, sd_name) = names;
        let n = self.count(count, values.len());
        self.real(mean_name, mean(mean_name, values)?);
        self.real(sd_name, std_dev(sd_name, values, ddof)?);
        Ok(n)
    }
}

/// Compute the full statistic set for one session
pub fn summarize(
    sid: &str,
    dataset: &Dataset,
    config: &AnalysisConfig,
) -> Result<Summary, VmrkError> {
    let ddof = config.ddof;
    let all = dataset.collapse();
    let all_times = all.response_times();
    let correct_times = all.query(&TrialFilter::new().correct(true));
    let error_times = all.query(&TrialFilter::new().correct(false));

    let mut b = SummaryBuilder::default();

    // Overall accuracy and response times
    let fcn = b.count("fcn", correct_times.len());
    b.count("fen", error_times.len());
    b.real("facc", 100.0 * ratio("facc", fcn, all_times.len())?);

    b.real("frtm", mean("frtm", &all_times)?);
    b.real("frtsd", std_dev("frtsd", &all_times, ddof)?);
    b.real("frtmc", mean("frtmc", &correct_times)?);
    b.real("frtsdc", std_dev("frtsdc", &correct_times, ddof)?);
    b.real("frtme", mean("frtme", &error_times)?);
    b.real("frtsde", std_dev("frtsde", &error_times, ddof)?);

    // Congruent trials
    let fccn = b.sample(
        ("fccn", "fcrtmc", "fcrtsdc"),
        &all.query(&TrialFilter::new().correct(true).congruent(true)),
        ddof,
    )?;
    let fcen = b.sample(
        ("fcen", "fcrtme", "fcrtsde"),
        &all.query(&TrialFilter::new().correct(false).congruent(true)),
        ddof,
    )?;
    b.real("fcacc", 100.0 * ratio("fcacc", fccn, fccn + fcen)?);

    // Incongruent trials
    let ficn = b.sample(
        ("ficn", "firtmc", "firtsdc"),
        &all.query(&TrialFilter::new().correct(true).congruent(false)),
        ddof,
    )?;
    let fien = b.sample(
        ("fien", "firtme", "firtsde"),
        &all.query(&TrialFilter::new().correct(false).congruent(false)),
        ddof,
    )?;
    b.real("fiacc", 100.0 * ratio("fiacc", ficn, ficn + fien)?);

    // Sequential effects, computed per block
    let post_correct_correct =
        PostTrial::collect(dataset, &TrialFilter::new().correct(true).last_correct(true));
    let fpccn = b.count("fpccn", post_correct_correct.count);

    let post_correct_error =
        PostTrial::collect(dataset, &TrialFilter::new().correct(false).last_correct(true));
    let fpcen = b.count("fpcen", post_correct_error.count);
    let fpcertm = b.real("fpcertm", post_correct_error.mean_or_zero());

    let post_error_correct =
        PostTrial::collect(dataset, &TrialFilter::new().correct(true).last_correct(false));
    let fpecn = b.count("fpecn", post_error_correct.count);
    let fpecrtm = b.real("fpecrtm", post_error_correct.mean_or_zero());

    let post_error_error =
        PostTrial::collect(dataset, &TrialFilter::new().correct(false).last_correct(false));
    let fpeen = b.count("fpeen", post_error_error.count);
    let fpeertm = b.real("fpeertm", post_error_error.mean_or_zero());

    let post_error_any = PostTrial::collect(dataset, &TrialFilter::new().last_correct(false));
    b.count("fpexn", post_error_any.count);
    let fpexrtm = b.real("fpexrtm", post_error_any.mean_or_zero());

    let any_error = PostTrial::collect(dataset, &TrialFilter::new().correct(false));
    b.count("fpxen", any_error.count);
    let fpxertm = b.real("fpxertm", any_error.mean_or_zero());

    // Post-trial accuracies are proportions, not percentages
    b.real("faccpc", ratio("faccpc", fpccn, fpccn + fpcen)?);
    b.real("faccpe", ratio("faccpe", fpecn, fpecn + fpeen)?);

    // Post-error slowing
    b.real("fpes", fpeertm - fpecrtm);
    b.real("fpes2", fpcertm - fpecrtm);
    b.real("fpes3", fpxertm - fpexrtm);

    // Anticipatory responses
    let threshold = config.anticipatory_threshold_ms;
    b.count("fan", all_times.iter().filter(|&&t| t < threshold).count());
    b.count("faen", error_times.iter().filter(|&&t| t < threshold).count());

    // Trials with extra responses
    b.count(
        "fscn",
        all.records().iter().filter(|r| r.has_extra_responses()).count(),
    );

    log::debug!("Computed {} statistics for {}", b.stats.len(), sid);

    Ok(Summary {
        sid: sid.to_string(),
        stats: b.stats,
    })
}
