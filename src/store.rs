//! Publishing of observation archives and spike rasters as JSON files.
//!
//! A file only ever appears under its final name fully written: content goes to a
//! temporary file in the target directory, which is then renamed.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use simple_error::{try_with, SimpleResult};
use tempfile::NamedTempFile;

use crate::observation::{ObservationKey, ObservationTensor, SpikeRaster};

pub fn observations_file_name(key: &ObservationKey) -> String {
    format!("{}.json", key.file_stem())
}

pub fn raster_file_name(key: &ObservationKey) -> String {
    format!("{}_raster.json", key.file_stem())
}

pub fn write_observations(dir: &Path, tensor: &ObservationTensor) -> SimpleResult<PathBuf> {
    try_with!(tensor.validate(), "refusing to write inconsistent archive");
    let path = write_atomically(dir, &observations_file_name(&tensor.key), tensor)?;
    info!(
        "wrote {} bins x {} trials to {}",
        tensor.nb_bins,
        tensor.n_trials,
        path.display()
    );
    Ok(path)
}

pub fn read_observations(path: &Path) -> SimpleResult<ObservationTensor> {
    let file = try_with!(File::open(path), "failed to open {}", path.display());
    let tensor: ObservationTensor = try_with!(
        serde_json::from_reader(BufReader::new(file)),
        "failed to parse {}",
        path.display()
    );
    try_with!(tensor.validate(), "corrupt archive {}", path.display());
    Ok(tensor)
}

pub fn write_raster(dir: &Path, raster: &SpikeRaster) -> SimpleResult<PathBuf> {
    try_with!(raster.validate(), "refusing to write inconsistent raster");
    let path = write_atomically(dir, &raster_file_name(&raster.key), raster)?;
    info!("wrote {} spikes to {}", raster.events.len(), path.display());
    Ok(path)
}

pub fn read_raster(path: &Path) -> SimpleResult<SpikeRaster> {
    let file = try_with!(File::open(path), "failed to open {}", path.display());
    let raster: SpikeRaster = try_with!(
        serde_json::from_reader(BufReader::new(file)),
        "failed to parse {}",
        path.display()
    );
    try_with!(raster.validate(), "corrupt raster {}", path.display());
    Ok(raster)
}

fn write_atomically<T: Serialize>(dir: &Path, file_name: &str, value: &T) -> SimpleResult<PathBuf> {
    try_with!(fs::create_dir_all(dir), "failed to create {}", dir.display());

    let mut temp_file = try_with!(
        NamedTempFile::new_in(dir),
        "failed to create temporary file in {}",
        dir.display()
    );

    {
        let mut writer = BufWriter::new(temp_file.as_file_mut());
        try_with!(
            serde_json::to_writer(&mut writer, value),
            "failed to serialize {}",
            file_name
        );
        try_with!(writer.flush(), "failed to write {}", file_name);
    }

    try_with!(temp_file.as_file().sync_all(), "failed to sync {}", file_name);

    let path = dir.join(file_name);
    try_with!(temp_file.persist(&path), "failed to publish {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::StimMode;

    fn tensor(name: &str) -> ObservationTensor {
        let key = ObservationKey {
            name: name.to_string(),
            nb_neurons: 2,
            synapse_weight: 10.0,
            bin_size: 50,
            stim_mode: StimMode::Off,
        };

        let mut tensor = ObservationTensor::new(key, 2, 2);
        tensor.append_trial(vec![vec![1, 0], vec![0, 2]]).unwrap();
        tensor.append_trial(vec![vec![0, 0], vec![1, 1]]).unwrap();
        tensor
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tensor = tensor("pair");

        let path = write_observations(dir.path(), &tensor).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "pair_nb_neur_2_sw_10_tbs_50_stim_off.json"
        );

        assert_eq!(read_observations(&path).unwrap(), tensor);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn overwrite_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut bigger = tensor("pair");
        bigger.append_trial(vec![vec![3, 3], vec![3, 3]]).unwrap();
        write_observations(dir.path(), &bigger).unwrap();

        let smaller = tensor("pair");
        let path = write_observations(dir.path(), &smaller).unwrap();

        assert_eq!(read_observations(&path).unwrap(), smaller);
    }

    #[test]
    fn failed_publish_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let tensor = tensor("pair");

        // a directory squatting on the final name makes the rename fail
        let blocked = dir.path().join(observations_file_name(&tensor.key));
        fs::create_dir(&blocked).unwrap();

        assert!(write_observations(dir.path(), &tensor).is_err());
        assert!(blocked.is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn inconsistent_archive_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut tensor = tensor("pair");
        tensor.n_trials = 5;

        let result = write_observations(dir.path(), &tensor);
        assert!(result.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_archive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"key\":").unwrap();

        assert!(read_observations(&path).is_err());
    }

    #[test]
    fn raster_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let raster = SpikeRaster {
            key: tensor("pair").key,
            duration: 100,
            events: vec![(0, 3), (1, 4), (0, 40)],
        };

        let path = write_raster(dir.path(), &raster).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "pair_nb_neur_2_sw_10_tbs_50_stim_off_raster.json"
        );
        assert_eq!(read_raster(&path).unwrap(), raster);
    }

    #[test]
    fn raster_out_of_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut raster = SpikeRaster {
            key: tensor("pair").key,
            duration: 100,
            events: vec![(0, 3), (2, 4)],
        };

        assert_eq!(
            write_raster(dir.path(), &raster).unwrap_err().as_str(),
            "refusing to write inconsistent raster, \
             spike (2, 4) out of range for 2 neurons and duration 100"
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        raster.events = vec![(1, 101)];
        let path = dir.path().join(raster_file_name(&raster.key));
        fs::write(&path, serde_json::to_string(&raster).unwrap()).unwrap();

        assert_eq!(
            read_raster(&path).unwrap_err().as_str(),
            format!(
                "corrupt raster {}, spike (1, 101) out of range for 2 neurons and duration 100",
                path.display()
            )
        );
    }
}
