mod chunk_iter;
mod corrupt;
mod filters;
mod round_trip;
