mod fakes;
mod test_playback;
