pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, Transform, HW, TLBR, TLBR_};
pub use image::{imageops::FilterType, RgbImage};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use label::{BoxLabel, RawBoxLabel};
pub use log::{debug, info, trace, warn};
pub use ndarray::{s, Array3, Array4, ArrayView3, Axis};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    io::{self, BufReader, BufWriter, Read, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};
